use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TargetCreatedEvent {
    pub edge_id: Uuid,
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
    pub proposer_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MatchCreatedEvent {
    pub match_id: Uuid,
    pub edge_id: Uuid,
    pub source_booking_id: Uuid,
    pub target_booking_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ProposalRejectedEvent {
    pub edge_id: Uuid,
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
    pub reason: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MatchRolledBackEvent {
    pub match_id: Uuid,
    pub edge_id: Uuid,
    pub reason: String,
    pub timestamp: i64,
}

/// Outcome reported back by the ledger mint collaborator.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MintResultEvent {
    MintSucceeded { match_id: Uuid },
    MintFailed { match_id: Uuid, reason: String },
}

impl MintResultEvent {
    pub fn match_id(&self) -> Uuid {
        match self {
            MintResultEvent::MintSucceeded { match_id } => *match_id,
            MintResultEvent::MintFailed { match_id, .. } => *match_id,
        }
    }
}

/// Fire-and-forget notification fanned out to interested parties.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    TargetCreated(TargetCreatedEvent),
    MatchCreated(MatchCreatedEvent),
    ProposalRejected(ProposalRejectedEvent),
    MatchRolledBack(MatchRolledBackEvent),
}
