use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use stayswap_core::booking::BookingDirectory;
use stayswap_core::repository::{
    AcceptWrite, MatchRepository, SwapRepository, TargetEventLog, TargetRepository,
};
use stayswap_core::RepoResult;
use stayswap_domain::{
    Booking, BookingStatus, EventFilter, MatchRecord, MatchStatus, Page, PageRequest, SortOrder,
    Swap, SwapStatus, SwapTarget, TargetEvent, TargetStatus,
};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    bookings: HashMap<Uuid, Booking>,
    swaps: HashMap<Uuid, Swap>,
    targets: HashMap<Uuid, SwapTarget>,
    matches: HashMap<Uuid, MatchRecord>,
    events: Vec<TargetEvent>,
}

/// In-memory backend implementing every repository trait behind one mutex,
/// which makes the compound operations naturally atomic. Used by the test
/// suites and local runs without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/dev seam standing in for the external booking service's data.
    pub fn seed_booking(&self, booking: Booking) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.bookings.insert(booking.id, booking);
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.bookings.get(&id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn has_active_incoming(inner: &Inner, target_swap_id: Uuid, excluding: Option<Uuid>) -> bool {
    inner.targets.values().any(|e| {
        e.status == TargetStatus::Active
            && e.target_swap_id == target_swap_id
            && Some(e.id) != excluding
    })
}

#[async_trait]
impl BookingDirectory for MemoryStore {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.lock().bookings.get(&id).cloned())
    }

    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> RepoResult<()> {
        let mut inner = self.lock();
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| format!("booking {} not found", id))?;
        booking.status = status;
        Ok(())
    }
}

#[async_trait]
impl SwapRepository for MemoryStore {
    async fn insert_swap(&self, swap: &Swap) -> RepoResult<()> {
        self.lock().swaps.insert(swap.id, swap.clone());
        Ok(())
    }

    async fn get_swap(&self, id: Uuid) -> RepoResult<Option<Swap>> {
        Ok(self.lock().swaps.get(&id).cloned())
    }

    async fn find_active_by_booking(&self, booking_id: Uuid) -> RepoResult<Option<Swap>> {
        Ok(self
            .lock()
            .swaps
            .values()
            .find(|s| s.source_booking_id == booking_id && s.status == SwapStatus::Active)
            .cloned())
    }

    async fn set_swap_status(&self, id: Uuid, from: SwapStatus, to: SwapStatus) -> RepoResult<bool> {
        let mut inner = self.lock();
        match inner.swaps.get_mut(&id) {
            Some(swap) if swap.status == from => {
                swap.status = to;
                swap.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> RepoResult<Vec<Swap>> {
        Ok(self
            .lock()
            .swaps
            .values()
            .filter(|s| s.status == SwapStatus::Active && s.expires_at <= now)
            .cloned()
            .collect())
    }

    async fn expire_swap(&self, id: Uuid) -> RepoResult<Option<Vec<SwapTarget>>> {
        let mut inner = self.lock();
        match inner.swaps.get_mut(&id) {
            Some(swap) if swap.status == SwapStatus::Active => {
                swap.status = SwapStatus::Expired;
                swap.updated_at = Utc::now();
            }
            _ => return Ok(None),
        }

        let mut cancelled = Vec::new();
        for edge in inner.targets.values_mut() {
            if edge.status == TargetStatus::Active
                && (edge.source_swap_id == id || edge.target_swap_id == id)
            {
                edge.status = TargetStatus::Cancelled;
                edge.updated_at = Utc::now();
                cancelled.push(edge.clone());
            }
        }
        Ok(Some(cancelled))
    }
}

#[async_trait]
impl TargetRepository for MemoryStore {
    async fn insert_target(&self, edge: &SwapTarget, exclusive_target: bool) -> RepoResult<bool> {
        let mut inner = self.lock();
        if exclusive_target && has_active_incoming(&inner, edge.target_swap_id, None) {
            return Ok(false);
        }
        inner.targets.insert(edge.id, edge.clone());
        Ok(true)
    }

    async fn get_target(&self, id: Uuid) -> RepoResult<Option<SwapTarget>> {
        Ok(self.lock().targets.get(&id).cloned())
    }

    async fn set_target_status(
        &self,
        id: Uuid,
        from: TargetStatus,
        to: TargetStatus,
    ) -> RepoResult<bool> {
        let mut inner = self.lock();
        match inner.targets.get_mut(&id) {
            Some(edge) if edge.status == from => {
                edge.status = to;
                edge.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn outgoing(
        &self,
        source_swap_id: Uuid,
        include_historical: bool,
    ) -> RepoResult<Vec<SwapTarget>> {
        Ok(self
            .lock()
            .targets
            .values()
            .filter(|e| {
                e.source_swap_id == source_swap_id
                    && (include_historical || e.status == TargetStatus::Active)
            })
            .cloned()
            .collect())
    }

    async fn incoming(
        &self,
        target_swap_id: Uuid,
        include_historical: bool,
    ) -> RepoResult<Vec<SwapTarget>> {
        Ok(self
            .lock()
            .targets
            .values()
            .filter(|e| {
                e.target_swap_id == target_swap_id
                    && (include_historical || e.status == TargetStatus::Active)
            })
            .cloned()
            .collect())
    }

    async fn replace_outgoing(
        &self,
        cancel_edge_id: Uuid,
        new_edge: &SwapTarget,
        exclusive_target: bool,
    ) -> RepoResult<bool> {
        let mut inner = self.lock();
        // All checks before any write: the old edge stays untouched when the
        // replacement cannot go in.
        if exclusive_target
            && has_active_incoming(&inner, new_edge.target_swap_id, Some(cancel_edge_id))
        {
            return Ok(false);
        }
        let old = inner
            .targets
            .get_mut(&cancel_edge_id)
            .ok_or_else(|| format!("edge {} not found", cancel_edge_id))?;
        if old.status != TargetStatus::Active {
            return Err(format!("edge {} is not active", cancel_edge_id).into());
        }
        old.status = TargetStatus::Cancelled;
        old.updated_at = Utc::now();
        inner.targets.insert(new_edge.id, new_edge.clone());
        Ok(true)
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn get_match(&self, id: Uuid) -> RepoResult<Option<MatchRecord>> {
        Ok(self.lock().matches.get(&id).cloned())
    }

    async fn set_match_status(
        &self,
        id: Uuid,
        from: MatchStatus,
        to: MatchStatus,
    ) -> RepoResult<bool> {
        let mut inner = self.lock();
        match inner.matches.get_mut(&id) {
            Some(record) if record.status == from => {
                record.status = to;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_accept(&self, record: &MatchRecord) -> RepoResult<AcceptWrite> {
        let mut inner = self.lock();
        // All checks before all writes so a refusal leaves nothing mutated.
        match inner.targets.get(&record.edge_id) {
            Some(edge) if edge.status == TargetStatus::Active => {}
            _ => return Ok(AcceptWrite::EdgeNotActive),
        }
        for swap_id in [record.source_swap_id, record.target_swap_id] {
            match inner.swaps.get(&swap_id) {
                Some(swap) if swap.status == SwapStatus::Active => {}
                _ => return Ok(AcceptWrite::SwapNotActive(swap_id)),
            }
        }

        let now = Utc::now();
        if let Some(edge) = inner.targets.get_mut(&record.edge_id) {
            edge.status = TargetStatus::Accepted;
            edge.updated_at = now;
        }
        for swap_id in [record.source_swap_id, record.target_swap_id] {
            if let Some(swap) = inner.swaps.get_mut(&swap_id) {
                swap.status = SwapStatus::Matched;
                swap.updated_at = now;
            }
        }
        inner.matches.insert(record.id, record.clone());
        Ok(AcceptWrite::Applied)
    }

    async fn commit_rollback(&self, record: &MatchRecord) -> RepoResult<bool> {
        let mut inner = self.lock();
        match inner.matches.get(&record.id) {
            Some(m) if m.status == MatchStatus::Pending => {}
            _ => return Ok(false),
        }

        let now = Utc::now();
        if let Some(m) = inner.matches.get_mut(&record.id) {
            m.status = MatchStatus::RolledBack;
            m.updated_at = now;
        }
        if let Some(edge) = inner.targets.get_mut(&record.edge_id) {
            if edge.status == TargetStatus::Accepted {
                edge.status = TargetStatus::Active;
                edge.updated_at = now;
            }
        }
        for swap_id in [record.source_swap_id, record.target_swap_id] {
            if let Some(swap) = inner.swaps.get_mut(&swap_id) {
                if swap.status == SwapStatus::Matched {
                    swap.status = SwapStatus::Active;
                    swap.updated_at = now;
                }
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TargetEventLog for MemoryStore {
    async fn append(&self, event: &TargetEvent) -> RepoResult<()> {
        self.lock().events.push(event.clone());
        Ok(())
    }

    async fn query(&self, filter: &EventFilter, page: &PageRequest) -> RepoResult<Page<TargetEvent>> {
        let inner = self.lock();
        let mut items: Vec<TargetEvent> = inner
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        match page.sort {
            SortOrder::Asc => items.sort_by_key(|e| e.occurred_at),
            SortOrder::Desc => {
                items.sort_by_key(|e| e.occurred_at);
                items.reverse();
            }
        }

        let total = items.len() as u64;
        let norm = page.normalized();
        let items = items
            .into_iter()
            .skip(norm.offset() as usize)
            .take(norm.per_page as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: norm.page,
            per_page: norm.per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayswap_domain::{EventSeverity, SwapMode, TargetEventKind, SYSTEM_ACTOR};

    fn event(edge: Uuid, swap_a: Uuid, swap_b: Uuid, kind: TargetEventKind) -> TargetEvent {
        TargetEvent::record(
            edge,
            swap_a,
            swap_b,
            SYSTEM_ACTOR,
            kind,
            None,
            TargetStatus::Active,
            EventSeverity::Info,
            None,
        )
    }

    #[tokio::test]
    async fn test_cas_status_update() {
        let store = MemoryStore::new();
        let swap = Swap::new(
            Uuid::new_v4(),
            SwapMode::OneForOne,
            None,
            Utc::now() + chrono::Duration::days(1),
        );
        store.insert_swap(&swap).await.unwrap();

        assert!(store
            .set_swap_status(swap.id, SwapStatus::Active, SwapStatus::Matched)
            .await
            .unwrap());
        // Second CAS from ACTIVE must miss.
        assert!(!store
            .set_swap_status(swap.id, SwapStatus::Active, SwapStatus::Cancelled)
            .await
            .unwrap());
    }

    fn active_swap() -> Swap {
        Swap::new(
            Uuid::new_v4(),
            SwapMode::OneForOne,
            None,
            Utc::now() + chrono::Duration::days(1),
        )
    }

    #[tokio::test]
    async fn test_commit_accept_refuses_without_mutating() {
        let store = MemoryStore::new();
        let source = active_swap();
        let mut target = active_swap();
        target.status = SwapStatus::Cancelled;
        store.insert_swap(&source).await.unwrap();
        store.insert_swap(&target).await.unwrap();

        let edge = SwapTarget::new(source.id, target.id);
        assert!(store.insert_target(&edge, false).await.unwrap());

        let record = MatchRecord::new(
            edge.id,
            source.id,
            target.id,
            source.source_booking_id,
            target.source_booking_id,
        );
        let write = store.commit_accept(&record).await.unwrap();
        assert_eq!(write, AcceptWrite::SwapNotActive(target.id));

        // Refusal left every row untouched.
        let edge_after = store.get_target(edge.id).await.unwrap().unwrap();
        assert_eq!(edge_after.status, TargetStatus::Active);
        let source_after = store.get_swap(source.id).await.unwrap().unwrap();
        assert_eq!(source_after.status, SwapStatus::Active);
        assert!(store.get_match(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_accept_and_rollback_round_trip() {
        let store = MemoryStore::new();
        let source = active_swap();
        let target = active_swap();
        store.insert_swap(&source).await.unwrap();
        store.insert_swap(&target).await.unwrap();

        let edge = SwapTarget::new(source.id, target.id);
        assert!(store.insert_target(&edge, true).await.unwrap());

        let record = MatchRecord::new(
            edge.id,
            source.id,
            target.id,
            source.source_booking_id,
            target.source_booking_id,
        );
        assert_eq!(
            store.commit_accept(&record).await.unwrap(),
            AcceptWrite::Applied
        );
        // Second accept against the settled edge must commit nothing.
        assert_eq!(
            store.commit_accept(&record).await.unwrap(),
            AcceptWrite::EdgeNotActive
        );

        assert!(store.commit_rollback(&record).await.unwrap());
        let edge_after = store.get_target(edge.id).await.unwrap().unwrap();
        assert_eq!(edge_after.status, TargetStatus::Active);
        let source_after = store.get_swap(source.id).await.unwrap().unwrap();
        assert_eq!(source_after.status, SwapStatus::Active);
        // Rollback is gated on PENDING; a repeat is a no-op.
        assert!(!store.commit_rollback(&record).await.unwrap());
    }

    #[tokio::test]
    async fn test_exclusive_insert_refused_when_incoming_edge_exists() {
        let store = MemoryStore::new();
        let target = active_swap();
        let first = active_swap();
        let second = active_swap();
        for swap in [&target, &first, &second] {
            store.insert_swap(swap).await.unwrap();
        }

        let held = SwapTarget::new(first.id, target.id);
        assert!(store.insert_target(&held, true).await.unwrap());

        let contender = SwapTarget::new(second.id, target.id);
        assert!(!store.insert_target(&contender, true).await.unwrap());
        assert!(store.get_target(contender.id).await.unwrap().is_none());

        // Replacing the held edge with itself retargeted is allowed: the
        // exclusivity check ignores the edge being cancelled.
        let replacement = SwapTarget::new(first.id, target.id);
        assert!(store
            .replace_outgoing(held.id, &replacement, true)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_expire_swap_cancels_touching_edges() {
        let store = MemoryStore::new();
        let expiring = active_swap();
        let other = active_swap();
        let third = active_swap();
        for swap in [&expiring, &other, &third] {
            store.insert_swap(swap).await.unwrap();
        }

        let incoming = SwapTarget::new(other.id, expiring.id);
        let unrelated = SwapTarget::new(other.id, third.id);
        assert!(store.insert_target(&incoming, false).await.unwrap());
        assert!(store.insert_target(&unrelated, false).await.unwrap());

        let cancelled = store.expire_swap(expiring.id).await.unwrap().unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, incoming.id);
        let swap_after = store.get_swap(expiring.id).await.unwrap().unwrap();
        assert_eq!(swap_after.status, SwapStatus::Expired);
        let unrelated_after = store.get_target(unrelated.id).await.unwrap().unwrap();
        assert_eq!(unrelated_after.status, TargetStatus::Active);

        // Already expired: the CAS misses and nothing is returned.
        assert!(store.expire_swap(expiring.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_event_query_pagination() {
        let store = MemoryStore::new();
        let swap_a = Uuid::new_v4();
        let swap_b = Uuid::new_v4();
        for _ in 0..30 {
            store
                .append(&event(Uuid::new_v4(), swap_a, swap_b, TargetEventKind::Created))
                .await
                .unwrap();
        }

        let page = store
            .query(
                &EventFilter::default(),
                &PageRequest {
                    page: 2,
                    per_page: 10,
                    sort: SortOrder::Asc,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 30);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.page, 2);
    }

    #[tokio::test]
    async fn test_event_query_filters_by_swap() {
        let store = MemoryStore::new();
        let swap_a = Uuid::new_v4();
        let swap_b = Uuid::new_v4();
        let swap_c = Uuid::new_v4();
        store
            .append(&event(Uuid::new_v4(), swap_a, swap_b, TargetEventKind::Created))
            .await
            .unwrap();
        store
            .append(&event(Uuid::new_v4(), swap_c, swap_b, TargetEventKind::Created))
            .await
            .unwrap();

        let filter = EventFilter {
            swap_id: Some(swap_a),
            ..Default::default()
        };
        let page = store
            .query(&filter, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }
}
