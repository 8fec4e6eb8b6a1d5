use crate::error::{Outcome, SwapError};
use crate::locks::SwapLocks;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use stayswap_core::booking::BookingDirectory;
use stayswap_core::identity::OwnershipResolver;
use stayswap_core::ledger::LedgerMint;
use stayswap_core::notify::Notifier;
use stayswap_core::repository::{
    AcceptWrite, MatchRepository, SwapRepository, TargetEventLog, TargetRepository,
};
use stayswap_domain::{
    BookingStatus, EventSeverity, MatchRecord, MatchStatus, Swap, SwapMode, SwapTarget,
    TargetEvent, TargetEventKind, TargetStatus, SYSTEM_ACTOR,
};
use stayswap_shared::events::{
    MatchCreatedEvent, MatchRolledBackEvent, MintResultEvent, NotificationEvent,
    ProposalRejectedEvent,
};
use uuid::Uuid;

/// Atomic accept/reject resolution over targeting edges.
///
/// Concurrent accept/reject/retarget calls touching the same swap pair are
/// serialized through `SwapLocks`; the loser of a race observes
/// `EdgeNotActive` or `StaleSwapState` instead of succeeding against stale
/// data. Compare-and-set and transactional repository writes back the locks
/// so a transition can never be applied twice even across processes.
pub struct ResolutionEngine {
    swaps: Arc<dyn SwapRepository>,
    targets: Arc<dyn TargetRepository>,
    matches: Arc<dyn MatchRepository>,
    bookings: Arc<dyn BookingDirectory>,
    ownership: Arc<dyn OwnershipResolver>,
    log: Arc<dyn TargetEventLog>,
    notifier: Arc<dyn Notifier>,
    mint: Arc<dyn LedgerMint>,
    locks: SwapLocks,
    lock_wait: Duration,
}

impl ResolutionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        swaps: Arc<dyn SwapRepository>,
        targets: Arc<dyn TargetRepository>,
        matches: Arc<dyn MatchRepository>,
        bookings: Arc<dyn BookingDirectory>,
        ownership: Arc<dyn OwnershipResolver>,
        log: Arc<dyn TargetEventLog>,
        notifier: Arc<dyn Notifier>,
        mint: Arc<dyn LedgerMint>,
        locks: SwapLocks,
        lock_wait: Duration,
    ) -> Self {
        Self {
            swaps,
            targets,
            matches,
            bookings,
            ownership,
            log,
            notifier,
            mint,
            locks,
            lock_wait,
        }
    }

    /// Accept an incoming proposal, matching both swaps.
    ///
    /// Repeating an accept against an already-accepted edge is an
    /// informational no-op and never emits a second `MatchCreated`.
    pub async fn accept(
        &self,
        edge_id: Uuid,
        accepter: Uuid,
    ) -> Result<Outcome<MatchRecord>, SwapError> {
        let edge = self.load_edge(edge_id).await?;
        let _guard = self
            .locks
            .acquire(&[edge.source_swap_id, edge.target_swap_id], self.lock_wait)
            .await?;

        // Re-read under the lock; the caller may have observed stale state.
        let edge = self.load_edge(edge_id).await?;
        match edge.status {
            TargetStatus::Accepted => return Ok(Outcome::AlreadyApplied),
            TargetStatus::Rejected | TargetStatus::Cancelled => {
                return Err(SwapError::EdgeNotActive(edge_id))
            }
            TargetStatus::Active => {}
        }

        let source_swap = self.load_swap(edge.source_swap_id).await?;
        let target_swap = self.load_swap(edge.target_swap_id).await?;

        if !self
            .ownership
            .owns_booking(accepter, target_swap.source_booking_id)
            .await?
        {
            return Err(SwapError::OwnershipMismatch {
                user_id: accepter,
                swap_id: target_swap.id,
            });
        }

        let now = Utc::now();
        if !source_swap.is_active(now) {
            return Err(SwapError::StaleSwapState(source_swap.id));
        }
        // The sweep also expires windows, but the write path re-checks so
        // the two can never disagree for an accept.
        if !target_swap.is_active(now) || !target_swap.window_open(now) {
            return Err(SwapError::StaleSwapState(target_swap.id));
        }

        let record = MatchRecord::new(
            edge_id,
            source_swap.id,
            target_swap.id,
            source_swap.source_booking_id,
            target_swap.source_booking_id,
        );
        // Edge, both swaps, and the match row commit in one transaction; a
        // crash or a racing writer can never leave a partial accept behind.
        match self.matches.commit_accept(&record).await? {
            AcceptWrite::Applied => {}
            AcceptWrite::EdgeNotActive => return Err(SwapError::EdgeNotActive(edge_id)),
            AcceptWrite::SwapNotActive(swap_id) => {
                return Err(SwapError::StaleSwapState(swap_id))
            }
        }
        self.log
            .append(&TargetEvent::record(
                edge_id,
                edge.source_swap_id,
                edge.target_swap_id,
                accepter,
                TargetEventKind::Accepted,
                Some(TargetStatus::Active),
                TargetStatus::Accepted,
                EventSeverity::Info,
                None,
            ))
            .await?;

        // Auction mode: the winner displaces every competing bid. One-for-one
        // targets cannot have competing active edges in the first place.
        if target_swap.mode == SwapMode::Auction {
            self.reject_competitors(&edge, &target_swap, accepter).await?;
        }

        self.bookings
            .set_booking_status(source_swap.source_booking_id, BookingStatus::Swapping)
            .await?;
        self.bookings
            .set_booking_status(target_swap.source_booking_id, BookingStatus::Swapping)
            .await?;

        let event = MatchCreatedEvent {
            match_id: record.id,
            edge_id,
            source_booking_id: record.source_booking_id,
            target_booking_id: record.target_booking_id,
            timestamp: Utc::now().timestamp(),
        };
        self.notifier
            .notify(NotificationEvent::MatchCreated(event.clone()));
        if let Err(e) = self.mint.submit(&event).await {
            // At-least-once hand-off; a stuck PENDING match is recoverable
            // through rollback once the collaborator reports.
            tracing::error!("Failed to submit match {} for minting: {}", record.id, e);
        }

        tracing::info!(
            "Match {} created between swaps {} and {}",
            record.id,
            source_swap.id,
            target_swap.id
        );
        Ok(Outcome::Applied(record))
    }

    /// Reject an incoming proposal. Frees the target for new proposals and
    /// the source's outgoing slot; no sibling edge is touched.
    pub async fn reject(
        &self,
        edge_id: Uuid,
        rejecter: Uuid,
        reason: Option<String>,
    ) -> Result<Outcome<()>, SwapError> {
        let edge = self.load_edge(edge_id).await?;
        let _guard = self
            .locks
            .acquire(&[edge.source_swap_id, edge.target_swap_id], self.lock_wait)
            .await?;

        let edge = self.load_edge(edge_id).await?;
        match edge.status {
            TargetStatus::Rejected => return Ok(Outcome::AlreadyApplied),
            TargetStatus::Accepted | TargetStatus::Cancelled => {
                return Err(SwapError::EdgeNotActive(edge_id))
            }
            TargetStatus::Active => {}
        }

        let target_swap = self.load_swap(edge.target_swap_id).await?;
        if !self
            .ownership
            .owns_booking(rejecter, target_swap.source_booking_id)
            .await?
        {
            return Err(SwapError::OwnershipMismatch {
                user_id: rejecter,
                swap_id: target_swap.id,
            });
        }

        if !self
            .targets
            .set_target_status(edge_id, TargetStatus::Active, TargetStatus::Rejected)
            .await?
        {
            return Err(SwapError::EdgeNotActive(edge_id));
        }
        self.log
            .append(&TargetEvent::record(
                edge_id,
                edge.source_swap_id,
                edge.target_swap_id,
                rejecter,
                TargetEventKind::Rejected,
                Some(TargetStatus::Active),
                TargetStatus::Rejected,
                EventSeverity::Info,
                reason.clone(),
            ))
            .await?;

        self.notifier
            .notify(NotificationEvent::ProposalRejected(ProposalRejectedEvent {
                edge_id,
                source_swap_id: edge.source_swap_id,
                target_swap_id: edge.target_swap_id,
                reason,
                timestamp: Utc::now().timestamp(),
            }));

        Ok(Outcome::Applied(()))
    }

    /// Revert a match whose mint failed: the edge returns to `ACTIVE`, both
    /// swaps to `ACTIVE`, both bookings to `AVAILABLE`. Idempotent by match
    /// id.
    pub async fn rollback(&self, match_id: Uuid) -> Result<Outcome<()>, SwapError> {
        let record = self.load_match(match_id).await?;
        let _guard = self
            .locks
            .acquire(
                &[record.source_swap_id, record.target_swap_id],
                self.lock_wait,
            )
            .await?;

        let record = self.load_match(match_id).await?;
        match record.status {
            MatchStatus::RolledBack => return Ok(Outcome::AlreadyApplied),
            MatchStatus::Minted => {
                return Err(SwapError::InvalidTransition {
                    from: MatchStatus::Minted.to_string(),
                    to: MatchStatus::RolledBack.to_string(),
                })
            }
            MatchStatus::Pending => {}
        }

        // Match, edge, and both swaps revert in one transaction, gated on the
        // match still being PENDING.
        if !self.matches.commit_rollback(&record).await? {
            return Ok(Outcome::AlreadyApplied);
        }
        self.log
            .append(&TargetEvent::record(
                record.edge_id,
                record.source_swap_id,
                record.target_swap_id,
                SYSTEM_ACTOR,
                TargetEventKind::Reinstated,
                Some(TargetStatus::Accepted),
                TargetStatus::Active,
                EventSeverity::Error,
                Some("mint failed".to_string()),
            ))
            .await?;

        self.bookings
            .set_booking_status(record.source_booking_id, BookingStatus::Available)
            .await?;
        self.bookings
            .set_booking_status(record.target_booking_id, BookingStatus::Available)
            .await?;

        self.notifier
            .notify(NotificationEvent::MatchRolledBack(MatchRolledBackEvent {
                match_id,
                edge_id: record.edge_id,
                reason: "mint failed".to_string(),
                timestamp: Utc::now().timestamp(),
            }));

        tracing::warn!("Match {} rolled back after mint failure", match_id);
        Ok(Outcome::Applied(()))
    }

    /// Finalize a match once the ledger confirms the mint; both bookings
    /// settle as `MATCHED`. Idempotent by match id.
    pub async fn confirm_mint(&self, match_id: Uuid) -> Result<Outcome<()>, SwapError> {
        let record = self.load_match(match_id).await?;
        let _guard = self
            .locks
            .acquire(
                &[record.source_swap_id, record.target_swap_id],
                self.lock_wait,
            )
            .await?;

        let record = self.load_match(match_id).await?;
        match record.status {
            MatchStatus::Minted => return Ok(Outcome::AlreadyApplied),
            MatchStatus::RolledBack => {
                return Err(SwapError::InvalidTransition {
                    from: MatchStatus::RolledBack.to_string(),
                    to: MatchStatus::Minted.to_string(),
                })
            }
            MatchStatus::Pending => {}
        }

        if !self
            .matches
            .set_match_status(match_id, MatchStatus::Pending, MatchStatus::Minted)
            .await?
        {
            return Ok(Outcome::AlreadyApplied);
        }

        self.bookings
            .set_booking_status(record.source_booking_id, BookingStatus::Matched)
            .await?;
        self.bookings
            .set_booking_status(record.target_booking_id, BookingStatus::Matched)
            .await?;

        Ok(Outcome::Applied(()))
    }

    /// Entry point for the mint-result consumer. Delivery is at-least-once;
    /// both branches are idempotent by match id.
    pub async fn on_mint_result(&self, event: MintResultEvent) -> Result<(), SwapError> {
        match event {
            MintResultEvent::MintSucceeded { match_id } => {
                self.confirm_mint(match_id).await?;
            }
            MintResultEvent::MintFailed { match_id, reason } => {
                tracing::warn!("Mint failed for match {}: {}", match_id, reason);
                self.rollback(match_id).await?;
            }
        }
        Ok(())
    }

    async fn reject_competitors(
        &self,
        winner: &SwapTarget,
        target_swap: &Swap,
        accepter: Uuid,
    ) -> Result<(), SwapError> {
        let siblings = self.targets.incoming(target_swap.id, false).await?;
        for sibling in siblings {
            if sibling.id == winner.id {
                continue;
            }
            if !self
                .targets
                .set_target_status(sibling.id, TargetStatus::Active, TargetStatus::Rejected)
                .await?
            {
                continue;
            }
            self.log
                .append(&TargetEvent::record(
                    sibling.id,
                    sibling.source_swap_id,
                    sibling.target_swap_id,
                    accepter,
                    TargetEventKind::Rejected,
                    Some(TargetStatus::Active),
                    TargetStatus::Rejected,
                    EventSeverity::Warning,
                    Some("auction resolved".to_string()),
                ))
                .await?;
            self.notifier
                .notify(NotificationEvent::ProposalRejected(ProposalRejectedEvent {
                    edge_id: sibling.id,
                    source_swap_id: sibling.source_swap_id,
                    target_swap_id: sibling.target_swap_id,
                    reason: Some("auction resolved".to_string()),
                    timestamp: Utc::now().timestamp(),
                }));
        }
        Ok(())
    }

    async fn load_edge(&self, id: Uuid) -> Result<SwapTarget, SwapError> {
        self.targets
            .get_target(id)
            .await?
            .ok_or(SwapError::EdgeNotFound(id))
    }

    async fn load_swap(&self, id: Uuid) -> Result<Swap, SwapError> {
        self.swaps
            .get_swap(id)
            .await?
            .ok_or(SwapError::SwapNotFound(id))
    }

    async fn load_match(&self, id: Uuid) -> Result<MatchRecord, SwapError> {
        self.matches
            .get_match(id)
            .await?
            .ok_or(SwapError::MatchNotFound(id))
    }
}
