use crate::RepoResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stayswap_domain::{
    EventFilter, MatchRecord, MatchStatus, Page, PageRequest, Swap, SwapStatus, SwapTarget,
    TargetEvent, TargetStatus,
};
use uuid::Uuid;

/// Repository trait for swap listings.
#[async_trait]
pub trait SwapRepository: Send + Sync {
    async fn insert_swap(&self, swap: &Swap) -> RepoResult<()>;

    async fn get_swap(&self, id: Uuid) -> RepoResult<Option<Swap>>;

    async fn find_active_by_booking(&self, booking_id: Uuid) -> RepoResult<Option<Swap>>;

    /// Compare-and-set status update; returns false when the row was not in
    /// `from` anymore.
    async fn set_swap_status(&self, id: Uuid, from: SwapStatus, to: SwapStatus) -> RepoResult<bool>;

    async fn list_expired_active(&self, now: DateTime<Utc>) -> RepoResult<Vec<Swap>>;

    /// Expire the swap and cancel every active edge touching it, in one
    /// transaction. Returns the cancelled edges, or `None` when the swap was
    /// no longer ACTIVE (nothing committed).
    async fn expire_swap(&self, id: Uuid) -> RepoResult<Option<Vec<SwapTarget>>>;
}

/// Repository trait for targeting edges.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Insert a new ACTIVE edge. When `exclusive_target` is set the backend
    /// must guarantee, durably and under concurrency, that no other active
    /// incoming edge exists on the target swap; returns false (nothing
    /// committed) when that guarantee would be violated.
    async fn insert_target(&self, edge: &SwapTarget, exclusive_target: bool) -> RepoResult<bool>;

    async fn get_target(&self, id: Uuid) -> RepoResult<Option<SwapTarget>>;

    /// Compare-and-set status update; returns false when the edge was not in
    /// `from` anymore.
    async fn set_target_status(
        &self,
        id: Uuid,
        from: TargetStatus,
        to: TargetStatus,
    ) -> RepoResult<bool>;

    async fn outgoing(&self, source_swap_id: Uuid, include_historical: bool)
        -> RepoResult<Vec<SwapTarget>>;

    async fn incoming(&self, target_swap_id: Uuid, include_historical: bool)
        -> RepoResult<Vec<SwapTarget>>;

    /// Cancel `cancel_edge_id` and insert `new_edge` atomically; backends
    /// must commit both or neither. `exclusive_target` carries the same
    /// durable incoming-exclusivity guarantee as `insert_target`; returns
    /// false (nothing committed, the old edge untouched) when it would be
    /// violated.
    async fn replace_outgoing(
        &self,
        cancel_edge_id: Uuid,
        new_edge: &SwapTarget,
        exclusive_target: bool,
    ) -> RepoResult<bool>;
}

/// Result of the transactional accept write. Anything but `Applied` means
/// nothing was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptWrite {
    Applied,
    /// The edge was no longer ACTIVE.
    EdgeNotActive,
    /// One of the two swaps was no longer ACTIVE.
    SwapNotActive(Uuid),
}

/// Repository trait for match records, including the cross-table writes that
/// settle or revert one.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn get_match(&self, id: Uuid) -> RepoResult<Option<MatchRecord>>;

    async fn set_match_status(
        &self,
        id: Uuid,
        from: MatchStatus,
        to: MatchStatus,
    ) -> RepoResult<bool>;

    /// One transaction for the accept: edge ACTIVE->ACCEPTED, both swaps
    /// ACTIVE->MATCHED, insert the PENDING match record. All-or-nothing; a
    /// partial accept is never observable.
    async fn commit_accept(&self, record: &MatchRecord) -> RepoResult<AcceptWrite>;

    /// One transaction for the rollback: match PENDING->ROLLED_BACK, edge
    /// ACCEPTED->ACTIVE, both swaps MATCHED->ACTIVE. Returns false (nothing
    /// committed) when the match was no longer PENDING.
    async fn commit_rollback(&self, record: &MatchRecord) -> RepoResult<bool>;
}

/// Append-only audit log over edge transitions.
#[async_trait]
pub trait TargetEventLog: Send + Sync {
    async fn append(&self, event: &TargetEvent) -> RepoResult<()>;

    async fn query(&self, filter: &EventFilter, page: &PageRequest)
        -> RepoResult<Page<TargetEvent>>;
}
