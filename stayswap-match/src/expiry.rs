use crate::error::SwapError;
use crate::locks::SwapLocks;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use stayswap_core::repository::{SwapRepository, TargetEventLog};
use stayswap_domain::{
    EventSeverity, TargetEvent, TargetEventKind, TargetStatus, SYSTEM_ACTOR,
};

/// Periodic sweep expiring overdue swaps and cascading cancellation of
/// their active edges.
///
/// The accept path re-checks expiry at write time, so the sweep and the
/// inline check can never disagree about a match.
pub struct ExpirySweeper {
    swaps: Arc<dyn SwapRepository>,
    log: Arc<dyn TargetEventLog>,
    locks: SwapLocks,
    lock_wait: Duration,
}

impl ExpirySweeper {
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        log: Arc<dyn TargetEventLog>,
        locks: SwapLocks,
        lock_wait: Duration,
    ) -> Self {
        Self {
            swaps,
            log,
            locks,
            lock_wait,
        }
    }

    /// Expire every active swap past its deadline at `now`. Returns the
    /// number of swaps transitioned.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, SwapError> {
        let overdue = self.swaps.list_expired_active(now).await?;
        let mut expired = 0;

        for swap in overdue {
            // A held lock means an accept/reject is in flight on this swap;
            // skip it, the next sweep will pick it up.
            let guard = match self.locks.acquire(&[swap.id], self.lock_wait).await {
                Ok(guard) => guard,
                Err(SwapError::ConcurrentModification) => continue,
                Err(e) => return Err(e),
            };

            // The swap and its edges expire in one transaction; a crash
            // cannot strand live edges on an expired swap.
            let cancelled = match self.swaps.expire_swap(swap.id).await? {
                Some(edges) => edges,
                // Lost the race to an accept; nothing to cascade.
                None => continue,
            };
            expired += 1;

            for edge in cancelled {
                self.log
                    .append(&TargetEvent::record(
                        edge.id,
                        edge.source_swap_id,
                        edge.target_swap_id,
                        SYSTEM_ACTOR,
                        TargetEventKind::Expired,
                        Some(TargetStatus::Active),
                        TargetStatus::Cancelled,
                        EventSeverity::Warning,
                        Some("swap expired".to_string()),
                    ))
                    .await?;
            }

            drop(guard);
            tracing::info!("Expired swap {}", swap.id);
        }

        Ok(expired)
    }
}
