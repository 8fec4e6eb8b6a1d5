use crate::ParseStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A booking's listing as exchangeable.
///
/// Ownership is never stored here; it is always derived through
/// `Booking(source_booking_id).owner_id` at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swap {
    pub id: Uuid,
    pub source_booking_id: Uuid,
    pub mode: SwapMode,
    pub auction_window: Option<AuctionWindow>,
    pub expires_at: DateTime<Utc>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    pub fn new(
        source_booking_id: Uuid,
        mode: SwapMode,
        auction_window: Option<AuctionWindow>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_booking_id,
            mode,
            auction_window,
            expires_at,
            status: SwapStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Listed and not past its expiry at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SwapStatus::Active && self.expires_at > now
    }

    /// Auction swaps only accept proposals inside their window; other modes
    /// have no window to check.
    pub fn window_open(&self, now: DateTime<Utc>) -> bool {
        match (&self.mode, &self.auction_window) {
            (SwapMode::Auction, Some(window)) => window.contains(now),
            (SwapMode::Auction, None) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapMode {
    OneForOne,
    Auction,
}

impl fmt::Display for SwapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapMode::OneForOne => "ONE_FOR_ONE",
            SwapMode::Auction => "AUCTION",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SwapMode {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE_FOR_ONE" => Ok(SwapMode::OneForOne),
            "AUCTION" => Ok(SwapMode::Auction),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuctionWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl AuctionWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    Active,
    Matched,
    Expired,
    Cancelled,
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapStatus::Active => "ACTIVE",
            SwapStatus::Matched => "MATCHED",
            SwapStatus::Expired => "EXPIRED",
            SwapStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SwapStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SwapStatus::Active),
            "MATCHED" => Ok(SwapStatus::Matched),
            "EXPIRED" => Ok(SwapStatus::Expired),
            "CANCELLED" => Ok(SwapStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
