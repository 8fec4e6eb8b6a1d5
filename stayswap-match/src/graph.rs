use crate::error::{Outcome, SwapError};
use crate::locks::SwapLocks;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use stayswap_core::identity::OwnershipResolver;
use stayswap_core::notify::Notifier;
use stayswap_core::repository::{SwapRepository, TargetEventLog, TargetRepository};
use stayswap_domain::{
    EventSeverity, Swap, SwapMode, SwapTarget, TargetEvent, TargetEventKind, TargetStatus,
};
use stayswap_shared::events::{NotificationEvent, TargetCreatedEvent};
use uuid::Uuid;

/// The directed targeting graph between swaps.
///
/// Structural invariants enforced here:
/// - a swap has at most one active outgoing edge;
/// - a one-for-one swap has at most one active incoming edge;
/// - no edge points at its own swap. Longer cycles are allowed.
pub struct TargetingGraph {
    swaps: Arc<dyn SwapRepository>,
    targets: Arc<dyn TargetRepository>,
    ownership: Arc<dyn OwnershipResolver>,
    log: Arc<dyn TargetEventLog>,
    notifier: Arc<dyn Notifier>,
    locks: SwapLocks,
    lock_wait: Duration,
}

impl TargetingGraph {
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        targets: Arc<dyn TargetRepository>,
        ownership: Arc<dyn OwnershipResolver>,
        log: Arc<dyn TargetEventLog>,
        notifier: Arc<dyn Notifier>,
        locks: SwapLocks,
        lock_wait: Duration,
    ) -> Self {
        Self {
            swaps,
            targets,
            ownership,
            log,
            notifier,
            locks,
            lock_wait,
        }
    }

    pub async fn create_target(
        &self,
        source_swap_id: Uuid,
        target_swap_id: Uuid,
        proposer: Uuid,
    ) -> Result<SwapTarget, SwapError> {
        if source_swap_id == target_swap_id {
            return Err(SwapError::SelfTarget);
        }

        let _guard = self
            .locks
            .acquire(&[source_swap_id, target_swap_id], self.lock_wait)
            .await?;

        let source = self.load_swap(source_swap_id).await?;
        let target = self.load_swap(target_swap_id).await?;

        self.validate_new_edge(&source, &target, proposer, None).await?;

        let edge = SwapTarget::new(source_swap_id, target_swap_id);
        // The store re-checks one-for-one exclusivity inside its transaction,
        // so two processes cannot both land an incoming edge.
        if !self
            .targets
            .insert_target(&edge, target.mode == SwapMode::OneForOne)
            .await?
        {
            return Err(SwapError::TargetExclusivityViolation(target.id));
        }
        self.log
            .append(&TargetEvent::record(
                edge.id,
                source_swap_id,
                target_swap_id,
                proposer,
                TargetEventKind::Created,
                None,
                TargetStatus::Active,
                EventSeverity::Info,
                None,
            ))
            .await?;

        self.notifier
            .notify(NotificationEvent::TargetCreated(TargetCreatedEvent {
                edge_id: edge.id,
                source_swap_id,
                target_swap_id,
                proposer_id: proposer,
                timestamp: Utc::now().timestamp(),
            }));

        tracing::info!("Swap {} now targets swap {}", source_swap_id, target_swap_id);
        Ok(edge)
    }

    /// Atomically replace the source swap's outgoing edge with one pointing
    /// at `new_target_swap_id`.
    ///
    /// The replacement edge is validated in full before anything mutates; a
    /// failed validation leaves the existing edge untouched.
    pub async fn retarget(
        &self,
        source_swap_id: Uuid,
        new_target_swap_id: Uuid,
        proposer: Uuid,
    ) -> Result<SwapTarget, SwapError> {
        if source_swap_id == new_target_swap_id {
            return Err(SwapError::SelfTarget);
        }

        let existing = self
            .current_target(source_swap_id)
            .await?
            .ok_or(SwapError::EdgeNotFound(source_swap_id))?;

        let _guard = self
            .locks
            .acquire(
                &[source_swap_id, existing.target_swap_id, new_target_swap_id],
                self.lock_wait,
            )
            .await?;

        // Re-read under the lock; a concurrent accept/cancel may have won.
        let existing = self
            .targets
            .get_target(existing.id)
            .await?
            .ok_or(SwapError::EdgeNotFound(existing.id))?;
        if existing.status != TargetStatus::Active {
            return Err(SwapError::EdgeNotActive(existing.id));
        }

        let source = self.load_swap(source_swap_id).await?;
        let new_target = self.load_swap(new_target_swap_id).await?;

        // The edge being replaced does not count against the outgoing slot.
        self.validate_new_edge(&source, &new_target, proposer, Some(existing.id))
            .await?;

        let edge = SwapTarget::new(source_swap_id, new_target_swap_id);
        if !self
            .targets
            .replace_outgoing(existing.id, &edge, new_target.mode == SwapMode::OneForOne)
            .await?
        {
            return Err(SwapError::TargetExclusivityViolation(new_target.id));
        }

        self.log
            .append(&TargetEvent::record(
                existing.id,
                existing.source_swap_id,
                existing.target_swap_id,
                proposer,
                TargetEventKind::Cancelled,
                Some(TargetStatus::Active),
                TargetStatus::Cancelled,
                EventSeverity::Info,
                Some("retargeted".to_string()),
            ))
            .await?;
        self.log
            .append(&TargetEvent::record(
                edge.id,
                source_swap_id,
                new_target_swap_id,
                proposer,
                TargetEventKind::Created,
                None,
                TargetStatus::Active,
                EventSeverity::Info,
                None,
            ))
            .await?;

        self.notifier
            .notify(NotificationEvent::TargetCreated(TargetCreatedEvent {
                edge_id: edge.id,
                source_swap_id,
                target_swap_id: new_target_swap_id,
                proposer_id: proposer,
                timestamp: Utc::now().timestamp(),
            }));

        Ok(edge)
    }

    /// Cancellation is open to the proposer and to the target swap's owner
    /// while the edge is active.
    pub async fn cancel_target(
        &self,
        edge_id: Uuid,
        requester: Uuid,
    ) -> Result<Outcome<()>, SwapError> {
        let edge = self
            .targets
            .get_target(edge_id)
            .await?
            .ok_or(SwapError::EdgeNotFound(edge_id))?;

        let _guard = self
            .locks
            .acquire(&[edge.source_swap_id, edge.target_swap_id], self.lock_wait)
            .await?;

        let edge = self
            .targets
            .get_target(edge_id)
            .await?
            .ok_or(SwapError::EdgeNotFound(edge_id))?;
        match edge.status {
            TargetStatus::Cancelled => return Ok(Outcome::AlreadyApplied),
            TargetStatus::Accepted | TargetStatus::Rejected => {
                return Err(SwapError::InvalidTransition {
                    from: edge.status.to_string(),
                    to: TargetStatus::Cancelled.to_string(),
                })
            }
            TargetStatus::Active => {}
        }

        let source = self.load_swap(edge.source_swap_id).await?;
        let target = self.load_swap(edge.target_swap_id).await?;
        let is_proposer = self
            .ownership
            .owns_booking(requester, source.source_booking_id)
            .await?;
        let is_target_owner = self
            .ownership
            .owns_booking(requester, target.source_booking_id)
            .await?;
        if !is_proposer && !is_target_owner {
            return Err(SwapError::OwnershipMismatch {
                user_id: requester,
                swap_id: edge.source_swap_id,
            });
        }

        if !self
            .targets
            .set_target_status(edge_id, TargetStatus::Active, TargetStatus::Cancelled)
            .await?
        {
            return Err(SwapError::EdgeNotActive(edge_id));
        }

        self.log
            .append(&TargetEvent::record(
                edge_id,
                edge.source_swap_id,
                edge.target_swap_id,
                requester,
                TargetEventKind::Cancelled,
                Some(TargetStatus::Active),
                TargetStatus::Cancelled,
                EventSeverity::Info,
                None,
            ))
            .await?;

        Ok(Outcome::Applied(()))
    }

    /// The swap's active outgoing edge, derived at read time. There is no
    /// stored "current target" pointer to fall out of sync.
    pub async fn current_target(&self, swap_id: Uuid) -> Result<Option<SwapTarget>, SwapError> {
        let mut active = self.targets.outgoing(swap_id, false).await?;
        Ok(active.pop())
    }

    pub async fn outgoing_targets(
        &self,
        swap_id: Uuid,
        include_historical: bool,
    ) -> Result<Vec<SwapTarget>, SwapError> {
        Ok(self.targets.outgoing(swap_id, include_historical).await?)
    }

    pub async fn incoming_targets(
        &self,
        swap_id: Uuid,
        include_historical: bool,
    ) -> Result<Vec<SwapTarget>, SwapError> {
        Ok(self.targets.incoming(swap_id, include_historical).await?)
    }

    async fn load_swap(&self, id: Uuid) -> Result<Swap, SwapError> {
        self.swaps
            .get_swap(id)
            .await?
            .ok_or(SwapError::SwapNotFound(id))
    }

    /// Shared validation for a prospective edge, in the documented order:
    /// ownership, liveness of both endpoints, the outgoing-slot invariant,
    /// then one-for-one exclusivity.
    async fn validate_new_edge(
        &self,
        source: &Swap,
        target: &Swap,
        proposer: Uuid,
        replacing_edge: Option<Uuid>,
    ) -> Result<(), SwapError> {
        if !self
            .ownership
            .owns_booking(proposer, source.source_booking_id)
            .await?
        {
            return Err(SwapError::OwnershipMismatch {
                user_id: proposer,
                swap_id: source.id,
            });
        }

        let now = Utc::now();
        if !source.is_active(now) {
            return Err(SwapError::SourceNotActive(source.id));
        }
        if !target.is_active(now) || !target.window_open(now) {
            return Err(SwapError::TargetNotActive(target.id));
        }

        let outgoing = self.targets.outgoing(source.id, false).await?;
        let blocking = outgoing
            .iter()
            .any(|edge| Some(edge.id) != replacing_edge);
        if blocking {
            return Err(SwapError::SourceAlreadyTargeting(source.id));
        }

        if target.mode == SwapMode::OneForOne {
            let incoming = self.targets.incoming(target.id, false).await?;
            let blocking = incoming
                .iter()
                .any(|edge| Some(edge.id) != replacing_edge);
            if blocking {
                return Err(SwapError::TargetExclusivityViolation(target.id));
            }
        }

        Ok(())
    }
}
