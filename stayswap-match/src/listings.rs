use crate::error::{Outcome, SwapError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use stayswap_core::booking::BookingDirectory;
use stayswap_core::identity::OwnershipResolver;
use stayswap_core::repository::SwapRepository;
use stayswap_domain::{AuctionWindow, BookingStatus, Swap, SwapMode, SwapStatus};
use uuid::Uuid;

/// Swap listing lifecycle: creation plus the terminal transitions.
///
/// Only `ACTIVE -> {MATCHED, CANCELLED, EXPIRED}` is legal; the terminal
/// states never transition again.
pub struct SwapService {
    swaps: Arc<dyn SwapRepository>,
    bookings: Arc<dyn BookingDirectory>,
    ownership: Arc<dyn OwnershipResolver>,
}

impl SwapService {
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        bookings: Arc<dyn BookingDirectory>,
        ownership: Arc<dyn OwnershipResolver>,
    ) -> Self {
        Self {
            swaps,
            bookings,
            ownership,
        }
    }

    pub async fn create_swap(
        &self,
        booking_id: Uuid,
        mode: SwapMode,
        auction_window: Option<AuctionWindow>,
        expires_at: DateTime<Utc>,
        acting_user: Uuid,
    ) -> Result<Swap, SwapError> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or(SwapError::BookingNotFound(booking_id))?;

        if !self.ownership.owns_booking(acting_user, booking_id).await? {
            return Err(SwapError::OwnershipMismatch {
                user_id: acting_user,
                swap_id: booking_id,
            });
        }

        if booking.status != BookingStatus::Available {
            return Err(SwapError::InvalidBookingState(booking_id));
        }

        if self.swaps.find_active_by_booking(booking_id).await?.is_some() {
            return Err(SwapError::DuplicateSwap(booking_id));
        }

        let now = Utc::now();
        if expires_at <= now {
            return Err(SwapError::InvalidExpiry);
        }
        Self::validate_window(mode, &auction_window, expires_at)?;

        let swap = Swap::new(booking_id, mode, auction_window, expires_at);
        self.swaps.insert_swap(&swap).await?;
        tracing::info!("Created {} swap {} for booking {}", mode, swap.id, booking_id);
        Ok(swap)
    }

    fn validate_window(
        mode: SwapMode,
        window: &Option<AuctionWindow>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SwapError> {
        match (mode, window) {
            (SwapMode::Auction, None) => Err(SwapError::MissingAuctionWindow),
            (SwapMode::Auction, Some(w)) => {
                if w.starts_at >= w.ends_at {
                    return Err(SwapError::InvalidAuctionWindow(
                        "window must start before it ends".to_string(),
                    ));
                }
                if w.ends_at > expires_at {
                    return Err(SwapError::InvalidAuctionWindow(
                        "window cannot outlive the swap".to_string(),
                    ));
                }
                Ok(())
            }
            (SwapMode::OneForOne, Some(_)) => Err(SwapError::InvalidAuctionWindow(
                "one-for-one swaps do not take an auction window".to_string(),
            )),
            (SwapMode::OneForOne, None) => Ok(()),
        }
    }

    pub async fn mark_matched(&self, swap_id: Uuid) -> Result<Outcome<()>, SwapError> {
        self.terminal_transition(swap_id, SwapStatus::Matched).await
    }

    pub async fn mark_cancelled(&self, swap_id: Uuid) -> Result<Outcome<()>, SwapError> {
        self.terminal_transition(swap_id, SwapStatus::Cancelled).await
    }

    async fn terminal_transition(
        &self,
        swap_id: Uuid,
        to: SwapStatus,
    ) -> Result<Outcome<()>, SwapError> {
        let swap = self
            .swaps
            .get_swap(swap_id)
            .await?
            .ok_or(SwapError::SwapNotFound(swap_id))?;

        if swap.status == to {
            return Ok(Outcome::AlreadyApplied);
        }
        if swap.status != SwapStatus::Active {
            return Err(SwapError::InvalidTransition {
                from: swap.status.to_string(),
                to: to.to_string(),
            });
        }

        if !self
            .swaps
            .set_swap_status(swap_id, SwapStatus::Active, to)
            .await?
        {
            return Err(SwapError::StaleSwapState(swap_id));
        }
        Ok(Outcome::Applied(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stayswap_core::identity::DerivedOwnershipResolver;
    use stayswap_domain::{AccommodationType, Booking, DateRange};
    use stayswap_store::memory::MemoryStore;

    fn booking(owner: Uuid) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            owner_id: owner,
            location: None,
            date_range: DateRange {
                start: chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                end: chrono::NaiveDate::from_ymd_opt(2026, 6, 7).unwrap(),
            },
            original_price_cents: 100_000,
            swap_value_cents: 100_000,
            currency: "EUR".to_string(),
            accommodation_type: AccommodationType::Apartment,
            guest_capacity: Some(2),
            status: BookingStatus::Available,
        }
    }

    fn service(store: &Arc<MemoryStore>) -> SwapService {
        SwapService::new(
            store.clone(),
            store.clone(),
            Arc::new(DerivedOwnershipResolver::new(store.clone())),
        )
    }

    #[tokio::test]
    async fn test_create_swap_happy_path() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let b = booking(owner);
        store.seed_booking(b.clone());

        let swap = service(&store)
            .create_swap(
                b.id,
                SwapMode::OneForOne,
                None,
                Utc::now() + Duration::days(30),
                owner,
            )
            .await
            .unwrap();

        assert_eq!(swap.status, SwapStatus::Active);
        assert_eq!(swap.source_booking_id, b.id);
    }

    #[tokio::test]
    async fn test_create_swap_rejects_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let b = booking(owner);
        store.seed_booking(b.clone());
        let svc = service(&store);

        let expires = Utc::now() + Duration::days(30);
        svc.create_swap(b.id, SwapMode::OneForOne, None, expires, owner)
            .await
            .unwrap();

        let err = svc
            .create_swap(b.id, SwapMode::OneForOne, None, expires, owner)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::DuplicateSwap(id) if id == b.id));
    }

    #[tokio::test]
    async fn test_create_swap_rejects_foreign_booking() {
        let store = Arc::new(MemoryStore::new());
        let b = booking(Uuid::new_v4());
        store.seed_booking(b.clone());

        let stranger = Uuid::new_v4();
        let err = service(&store)
            .create_swap(
                b.id,
                SwapMode::OneForOne,
                None,
                Utc::now() + Duration::days(30),
                stranger,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn test_create_swap_rejects_unavailable_booking() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let mut b = booking(owner);
        b.status = BookingStatus::Matched;
        store.seed_booking(b.clone());

        let err = service(&store)
            .create_swap(
                b.id,
                SwapMode::OneForOne,
                None,
                Utc::now() + Duration::days(30),
                owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InvalidBookingState(id) if id == b.id));
    }

    #[tokio::test]
    async fn test_auction_swap_requires_window() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let b = booking(owner);
        store.seed_booking(b.clone());

        let err = service(&store)
            .create_swap(
                b.id,
                SwapMode::Auction,
                None,
                Utc::now() + Duration::days(30),
                owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::MissingAuctionWindow));
    }

    #[tokio::test]
    async fn test_terminal_transitions() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let b = booking(owner);
        store.seed_booking(b.clone());
        let svc = service(&store);

        let swap = svc
            .create_swap(
                b.id,
                SwapMode::OneForOne,
                None,
                Utc::now() + Duration::days(30),
                owner,
            )
            .await
            .unwrap();

        // First transition applies, repeating it is an idempotent no-op.
        assert!(svc.mark_matched(swap.id).await.unwrap().is_applied());
        assert!(!svc.mark_matched(swap.id).await.unwrap().is_applied());

        // Crossing to a different terminal state is illegal.
        let err = svc.mark_cancelled(swap.id).await.unwrap_err();
        assert!(matches!(err, SwapError::InvalidTransition { .. }));
    }
}
