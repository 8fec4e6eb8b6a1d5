pub mod booking;
pub mod exchange;
pub mod history;
pub mod swap;
pub mod target;

pub use booking::{AccommodationType, Booking, BookingStatus, DateRange, Location};
pub use exchange::{MatchRecord, MatchStatus};
pub use history::{EventFilter, EventSeverity, Page, PageRequest, SortOrder, TargetEvent, TargetEventKind, SYSTEM_ACTOR};
pub use swap::{AuctionWindow, Swap, SwapMode, SwapStatus};
pub use target::{SwapTarget, TargetStatus};

/// Error returned when a status column holds text no variant matches.
#[derive(Debug, thiserror::Error)]
#[error("unknown status value: {0}")]
pub struct ParseStatusError(pub String);
