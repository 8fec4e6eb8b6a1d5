use crate::ParseStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A directed proposal edge from one swap toward another.
///
/// No proposer column: the proposer is the owner of the source swap's
/// booking, resolved at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapTarget {
    pub id: Uuid,
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
    pub status: TargetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapTarget {
    pub fn new(source_swap_id: Uuid, target_swap_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_swap_id,
            target_swap_id,
            status: TargetStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetStatus {
    Active,
    Accepted,
    Rejected,
    Cancelled,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetStatus::Active => "ACTIVE",
            TargetStatus::Accepted => "ACCEPTED",
            TargetStatus::Rejected => "REJECTED",
            TargetStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TargetStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(TargetStatus::Active),
            "ACCEPTED" => Ok(TargetStatus::Accepted),
            "REJECTED" => Ok(TargetStatus::Rejected),
            "CANCELLED" => Ok(TargetStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
