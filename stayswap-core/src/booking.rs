use crate::RepoResult;
use async_trait::async_trait;
use stayswap_domain::{Booking, BookingStatus};
use uuid::Uuid;

/// Seam to the external booking service.
///
/// The engine only ever reads booking records and writes their `status`
/// column; every other booking concern (CRUD, validation, images) lives with
/// the collaborator.
#[async_trait]
pub trait BookingDirectory: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> RepoResult<()>;
}
