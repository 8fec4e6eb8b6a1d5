use crate::ParseStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The record produced when an edge is accepted, binding two swaps and their
/// bookings until the ledger mint confirms or fails.
///
/// Mint/rollback handlers are keyed by this record's id, which is what makes
/// them safe to deliver more than once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub edge_id: Uuid,
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
    pub source_booking_id: Uuid,
    pub target_booking_id: Uuid,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(
        edge_id: Uuid,
        source_swap_id: Uuid,
        target_swap_id: Uuid,
        source_booking_id: Uuid,
        target_booking_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            edge_id,
            source_swap_id,
            target_swap_id,
            source_booking_id,
            target_booking_id,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Minted,
    RolledBack,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Minted => "MINTED",
            MatchStatus::RolledBack => "ROLLED_BACK",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MatchStatus::Pending),
            "MINTED" => Ok(MatchStatus::Minted),
            "ROLLED_BACK" => Ok(MatchStatus::RolledBack),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
