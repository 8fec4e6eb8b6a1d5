use crate::target::TargetStatus;
use crate::ParseStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Actor recorded for transitions driven by the engine itself (expiry
/// sweeps, mint rollbacks) rather than a user.
pub const SYSTEM_ACTOR: Uuid = Uuid::nil();

/// One append-only audit row per edge transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEvent {
    pub id: Uuid,
    pub edge_id: Uuid,
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
    pub actor: Uuid,
    pub kind: TargetEventKind,
    pub from_status: Option<TargetStatus>,
    pub to_status: TargetStatus,
    pub severity: EventSeverity,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TargetEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        edge_id: Uuid,
        source_swap_id: Uuid,
        target_swap_id: Uuid,
        actor: Uuid,
        kind: TargetEventKind,
        from_status: Option<TargetStatus>,
        to_status: TargetStatus,
        severity: EventSeverity,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            edge_id,
            source_swap_id,
            target_swap_id,
            actor,
            kind,
            from_status,
            to_status,
            severity,
            reason,
            occurred_at: Utc::now(),
        }
    }

    pub fn touches_swap(&self, swap_id: Uuid) -> bool {
        self.source_swap_id == swap_id || self.target_swap_id == swap_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetEventKind {
    Created,
    Accepted,
    Rejected,
    Cancelled,
    Expired,
    Reinstated,
}

impl fmt::Display for TargetEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetEventKind::Created => "CREATED",
            TargetEventKind::Accepted => "ACCEPTED",
            TargetEventKind::Rejected => "REJECTED",
            TargetEventKind::Cancelled => "CANCELLED",
            TargetEventKind::Expired => "EXPIRED",
            TargetEventKind::Reinstated => "REINSTATED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TargetEventKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TargetEventKind::Created),
            "ACCEPTED" => Ok(TargetEventKind::Accepted),
            "REJECTED" => Ok(TargetEventKind::Rejected),
            "CANCELLED" => Ok(TargetEventKind::Cancelled),
            "EXPIRED" => Ok(TargetEventKind::Expired),
            "REINSTATED" => Ok(TargetEventKind::Reinstated),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSeverity::Info => "INFO",
            EventSeverity::Warning => "WARNING",
            EventSeverity::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EventSeverity {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(EventSeverity::Info),
            "WARNING" => Ok(EventSeverity::Warning),
            "ERROR" => Ok(EventSeverity::Error),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Filter over the audit log; all fields are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub actor: Option<Uuid>,
    /// Matches events touching this swap on either endpoint.
    pub swap_id: Option<Uuid>,
    pub edge_id: Option<Uuid>,
    pub kind: Option<TargetEventKind>,
    pub severity: Option<EventSeverity>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &TargetEvent) -> bool {
        if let Some(actor) = self.actor {
            if event.actor != actor {
                return false;
            }
        }
        if let Some(swap_id) = self.swap_id {
            if !event.touches_swap(swap_id) {
                return false;
            }
        }
        if let Some(edge_id) = self.edge_id {
            if event.edge_id != edge_id {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if event.kind != kind {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if event.severity != severity {
                return false;
            }
        }
        if let Some(after) = self.occurred_after {
            if event.occurred_at < after {
                return false;
            }
        }
        if let Some(before) = self.occurred_before {
            if event.occurred_at > before {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub sort: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            sort: SortOrder::Desc,
        }
    }
}

impl PageRequest {
    /// Page numbers start at 1; page size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PAGE_SIZE),
            sort: self.sort,
        }
    }

    pub fn offset(&self) -> u64 {
        let norm = self.normalized();
        u64::from(norm.page - 1) * u64::from(norm.per_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}
