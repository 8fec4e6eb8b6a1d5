use crate::ParseStatusError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Snapshot of a booking as served by the external booking collaborator.
///
/// Optional fields model upstream data that may not resolve; consumers are
/// expected to degrade gracefully rather than fail on `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub location: Option<Location>,
    pub date_range: DateRange,
    pub original_price_cents: i64,
    pub swap_value_cents: i64,
    pub currency: String,
    pub accommodation_type: AccommodationType,
    pub guest_capacity: Option<u32>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Both stays begin in the same calendar month (seasonal overlap).
    pub fn same_start_month(&self, other: &DateRange) -> bool {
        self.start.month() == other.start.month()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccommodationType {
    Apartment,
    House,
    Villa,
    Studio,
    Cabin,
    Other,
}

impl AccommodationType {
    /// Rough grouping used when comparing non-identical types.
    pub fn family(&self) -> u8 {
        match self {
            AccommodationType::House | AccommodationType::Villa | AccommodationType::Cabin => 0,
            AccommodationType::Apartment | AccommodationType::Studio => 1,
            AccommodationType::Other => 2,
        }
    }
}

impl fmt::Display for AccommodationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccommodationType::Apartment => "APARTMENT",
            AccommodationType::House => "HOUSE",
            AccommodationType::Villa => "VILLA",
            AccommodationType::Studio => "STUDIO",
            AccommodationType::Cabin => "CABIN",
            AccommodationType::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AccommodationType {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APARTMENT" => Ok(AccommodationType::Apartment),
            "HOUSE" => Ok(AccommodationType::House),
            "VILLA" => Ok(AccommodationType::Villa),
            "STUDIO" => Ok(AccommodationType::Studio),
            "CABIN" => Ok(AccommodationType::Cabin),
            "OTHER" => Ok(AccommodationType::Other),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Available,
    Swapping,
    Matched,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Available => "AVAILABLE",
            BookingStatus::Swapping => "SWAPPING",
            BookingStatus::Matched => "MATCHED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(BookingStatus::Available),
            "SWAPPING" => Ok(BookingStatus::Swapping),
            "MATCHED" => Ok(BookingStatus::Matched),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nights() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 6, 7).unwrap(),
        };
        assert_eq!(range.nights(), 6);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Available,
            BookingStatus::Swapping,
            BookingStatus::Matched,
            BookingStatus::Cancelled,
        ] {
            let parsed: BookingStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("SOMETHING".parse::<BookingStatus>().is_err());
    }
}
