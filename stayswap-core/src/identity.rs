use crate::booking::BookingDirectory;
use crate::RepoResult;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Resolves whether a user owns a booking.
///
/// Every ownership check in the engine goes through this seam; nothing
/// caches the answer in a column of its own.
#[async_trait]
pub trait OwnershipResolver: Send + Sync {
    async fn owns_booking(&self, user_id: Uuid, booking_id: Uuid) -> RepoResult<bool>;
}

/// Derives ownership by joining through the booking record at read time.
///
/// This is the only source of truth for "who owns what" — swaps and edges
/// deliberately carry no owner/proposer fields that could drift from it.
pub struct DerivedOwnershipResolver {
    directory: Arc<dyn BookingDirectory>,
}

impl DerivedOwnershipResolver {
    pub fn new(directory: Arc<dyn BookingDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl OwnershipResolver for DerivedOwnershipResolver {
    async fn owns_booking(&self, user_id: Uuid, booking_id: Uuid) -> RepoResult<bool> {
        let booking = self.directory.get_booking(booking_id).await?;
        Ok(booking.map(|b| b.owner_id == user_id).unwrap_or(false))
    }
}
