//! End-to-end flows over the in-memory store: propose, resolve, mint,
//! rollback, expire.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stayswap_core::identity::DerivedOwnershipResolver;
use stayswap_core::ledger::MockLedgerMint;
use stayswap_core::notify::LoggingNotifier;
use stayswap_core::repository::{MatchRepository, SwapRepository, TargetRepository};
use stayswap_domain::{
    AccommodationType, AuctionWindow, Booking, BookingStatus, DateRange, EventFilter, MatchStatus,
    PageRequest, Swap, SwapMode, SwapStatus, TargetEventKind, TargetStatus,
};
use stayswap_match::{
    ExpirySweeper, Outcome, ResolutionEngine, SwapError, SwapLocks, SwapService, TargetingGraph,
    TargetingHistory,
};
use stayswap_shared::events::MintResultEvent;
use stayswap_store::MemoryStore;
use tokio::sync::mpsc;
use uuid::Uuid;

const LOCK_WAIT: Duration = Duration::from_millis(500);

struct Harness {
    store: Arc<MemoryStore>,
    service: SwapService,
    graph: TargetingGraph,
    engine: Arc<ResolutionEngine>,
    sweeper: ExpirySweeper,
    history: TargetingHistory,
    mint_results: mpsc::Receiver<MintResultEvent>,
}

fn harness(mint_fails: bool) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let ownership = Arc::new(DerivedOwnershipResolver::new(store.clone()));
    let notifier = Arc::new(LoggingNotifier);
    let (mint_tx, mint_results) = mpsc::channel(16);
    let mint = Arc::new(MockLedgerMint::new(mint_tx, mint_fails));
    let locks = SwapLocks::new();

    Harness {
        service: SwapService::new(store.clone(), store.clone(), ownership.clone()),
        graph: TargetingGraph::new(
            store.clone(),
            store.clone(),
            ownership.clone(),
            store.clone(),
            notifier.clone(),
            locks.clone(),
            LOCK_WAIT,
        ),
        engine: Arc::new(ResolutionEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            ownership.clone(),
            store.clone(),
            notifier,
            mint,
            locks.clone(),
            LOCK_WAIT,
        )),
        sweeper: ExpirySweeper::new(store.clone(), store.clone(), locks, LOCK_WAIT),
        history: TargetingHistory::new(store.clone()),
        store,
        mint_results,
    }
}

fn booking(owner: Uuid) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        owner_id: owner,
        location: None,
        date_range: DateRange {
            start: chrono::NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2026, 9, 8).unwrap(),
        },
        original_price_cents: 120_000,
        swap_value_cents: 110_000,
        currency: "EUR".to_string(),
        accommodation_type: AccommodationType::Apartment,
        guest_capacity: Some(4),
        status: BookingStatus::Available,
    }
}

/// Seeds a booking and lists it; returns (owner, swap).
async fn listed_swap(h: &Harness, mode: SwapMode, window: Option<AuctionWindow>) -> (Uuid, Swap) {
    let owner = Uuid::new_v4();
    let b = booking(owner);
    h.store.seed_booking(b.clone());
    let swap = h
        .service
        .create_swap(
            b.id,
            mode,
            window,
            Utc::now() + chrono::Duration::days(30),
            owner,
        )
        .await
        .unwrap();
    (owner, swap)
}

fn open_window() -> AuctionWindow {
    AuctionWindow {
        starts_at: Utc::now() - chrono::Duration::hours(1),
        ends_at: Utc::now() + chrono::Duration::days(7),
    }
}

#[tokio::test]
async fn test_one_for_one_accept_and_mint() {
    let mut h = harness(false);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (target_owner, target) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let edge = h
        .graph
        .create_target(source.id, target.id, proposer)
        .await
        .unwrap();

    let record = h
        .engine
        .accept(edge.id, target_owner)
        .await
        .unwrap()
        .applied()
        .unwrap();

    // Both swaps matched, both bookings mid-handover.
    let source = h.store.get_swap(source.id).await.unwrap().unwrap();
    let target = h.store.get_swap(target.id).await.unwrap().unwrap();
    assert_eq!(source.status, SwapStatus::Matched);
    assert_eq!(target.status, SwapStatus::Matched);
    assert_eq!(
        h.store.booking(record.source_booking_id).unwrap().status,
        BookingStatus::Swapping
    );
    assert_eq!(
        h.store.booking(record.target_booking_id).unwrap().status,
        BookingStatus::Swapping
    );

    // The mock ledger acknowledges; settle the match.
    let result = h.mint_results.recv().await.unwrap();
    assert!(matches!(result, MintResultEvent::MintSucceeded { match_id } if match_id == record.id));
    h.engine.on_mint_result(result).await.unwrap();

    let settled = h.store.get_match(record.id).await.unwrap().unwrap();
    assert_eq!(settled.status, MatchStatus::Minted);
    assert_eq!(
        h.store.booking(record.source_booking_id).unwrap().status,
        BookingStatus::Matched
    );
    assert_eq!(
        h.store.booking(record.target_booking_id).unwrap().status,
        BookingStatus::Matched
    );

    // Replaying the accept is a no-op, not a second match.
    let replay = h.engine.accept(edge.id, target_owner).await.unwrap();
    assert!(!replay.is_applied());
}

#[tokio::test]
async fn test_mint_failure_rolls_everything_back() {
    let mut h = harness(true);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (target_owner, target) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let edge = h
        .graph
        .create_target(source.id, target.id, proposer)
        .await
        .unwrap();
    let record = h
        .engine
        .accept(edge.id, target_owner)
        .await
        .unwrap()
        .applied()
        .unwrap();

    let result = h.mint_results.recv().await.unwrap();
    h.engine.on_mint_result(result).await.unwrap();

    let rolled = h.store.get_match(record.id).await.unwrap().unwrap();
    assert_eq!(rolled.status, MatchStatus::RolledBack);

    // The edge is live again and everything returned to its pre-accept state.
    let edge = h.store.get_target(edge.id).await.unwrap().unwrap();
    assert_eq!(edge.status, TargetStatus::Active);
    let source = h.store.get_swap(source.id).await.unwrap().unwrap();
    assert_eq!(source.status, SwapStatus::Active);
    assert_eq!(
        h.store.booking(record.source_booking_id).unwrap().status,
        BookingStatus::Available
    );
    assert_eq!(
        h.store.booking(record.target_booking_id).unwrap().status,
        BookingStatus::Available
    );

    // The reinstatement is on the audit record.
    let page = h
        .history
        .query(
            &EventFilter {
                kind: Some(TargetEventKind::Reinstated),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_auction_accept_rejects_competitors() {
    let h = harness(false);
    let (auctioneer, auction) = listed_swap(&h, SwapMode::Auction, Some(open_window())).await;
    let (bidder_a, swap_a) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (bidder_b, swap_b) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (bidder_c, swap_c) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let winner = h
        .graph
        .create_target(swap_a.id, auction.id, bidder_a)
        .await
        .unwrap();
    let loser_b = h
        .graph
        .create_target(swap_b.id, auction.id, bidder_b)
        .await
        .unwrap();
    let loser_c = h
        .graph
        .create_target(swap_c.id, auction.id, bidder_c)
        .await
        .unwrap();

    h.engine
        .accept(winner.id, auctioneer)
        .await
        .unwrap()
        .applied()
        .unwrap();

    for loser in [loser_b.id, loser_c.id] {
        let edge = h.store.get_target(loser).await.unwrap().unwrap();
        assert_eq!(edge.status, TargetStatus::Rejected);
    }

    // Losing proposers' swaps stay listable.
    let swap_b = h.store.get_swap(swap_b.id).await.unwrap().unwrap();
    assert_eq!(swap_b.status, SwapStatus::Active);
}

#[tokio::test]
async fn test_one_for_one_exclusivity() {
    let h = harness(false);
    let (_, target) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (proposer_a, swap_a) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (proposer_b, swap_b) = listed_swap(&h, SwapMode::OneForOne, None).await;

    h.graph
        .create_target(swap_a.id, target.id, proposer_a)
        .await
        .unwrap();

    let err = h
        .graph
        .create_target(swap_b.id, target.id, proposer_b)
        .await
        .unwrap_err();
    assert!(matches!(err, SwapError::TargetExclusivityViolation(id) if id == target.id));
}

#[tokio::test]
async fn test_retarget_replaces_edge_atomically() {
    let h = harness(false);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, first) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, second) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let old = h
        .graph
        .create_target(source.id, first.id, proposer)
        .await
        .unwrap();
    let new = h.graph.retarget(source.id, second.id, proposer).await.unwrap();

    let old = h.store.get_target(old.id).await.unwrap().unwrap();
    assert_eq!(old.status, TargetStatus::Cancelled);
    assert_eq!(new.target_swap_id, second.id);

    let current = h.graph.current_target(source.id).await.unwrap().unwrap();
    assert_eq!(current.id, new.id);

    // The displaced target is free for a new proposal again.
    let (other_proposer, other) = listed_swap(&h, SwapMode::OneForOne, None).await;
    h.graph
        .create_target(other.id, first.id, other_proposer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_retarget_leaves_old_edge_in_place() {
    let h = harness(false);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, first) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, second) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (rival, rival_swap) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let old = h
        .graph
        .create_target(source.id, first.id, proposer)
        .await
        .unwrap();
    // Someone else already holds `second`'s incoming slot.
    h.graph
        .create_target(rival_swap.id, second.id, rival)
        .await
        .unwrap();

    let err = h
        .graph
        .retarget(source.id, second.id, proposer)
        .await
        .unwrap_err();
    assert!(matches!(err, SwapError::TargetExclusivityViolation(id) if id == second.id));

    // The failed replacement changed nothing: the old edge is still live and
    // still the current target.
    let old = h.store.get_target(old.id).await.unwrap().unwrap();
    assert_eq!(old.status, TargetStatus::Active);
    let current = h.graph.current_target(source.id).await.unwrap().unwrap();
    assert_eq!(current.id, old.id);
    assert_eq!(current.target_swap_id, first.id);
}

#[tokio::test]
async fn test_expiry_sweep_cascades_cancellation() {
    let h = harness(false);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, target) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let edge = h
        .graph
        .create_target(source.id, target.id, proposer)
        .await
        .unwrap();

    // Nothing is overdue yet.
    assert_eq!(h.sweeper.sweep(Utc::now()).await.unwrap(), 0);

    let past_deadline = Utc::now() + chrono::Duration::days(31);
    assert_eq!(h.sweeper.sweep(past_deadline).await.unwrap(), 2);

    let source = h.store.get_swap(source.id).await.unwrap().unwrap();
    assert_eq!(source.status, SwapStatus::Expired);
    let edge = h.store.get_target(edge.id).await.unwrap().unwrap();
    assert_eq!(edge.status, TargetStatus::Cancelled);

    let page = h
        .history
        .query(
            &EventFilter {
                kind: Some(TargetEventKind::Expired),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_accepts_resolve_exactly_one() {
    let h = harness(false);
    let (auctioneer, auction) = listed_swap(&h, SwapMode::Auction, Some(open_window())).await;
    let (bidder_a, swap_a) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (bidder_b, swap_b) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let edge_a = h
        .graph
        .create_target(swap_a.id, auction.id, bidder_a)
        .await
        .unwrap();
    let edge_b = h
        .graph
        .create_target(swap_b.id, auction.id, bidder_b)
        .await
        .unwrap();

    let engine_a = h.engine.clone();
    let engine_b = h.engine.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { engine_a.accept(edge_a.id, auctioneer).await }),
        tokio::spawn(async move { engine_b.accept(edge_b.id, auctioneer).await }),
    );

    let results = [ra.unwrap(), rb.unwrap()];
    let wins = results
        .iter()
        .filter(|r| matches!(r, Ok(Outcome::Applied(_))))
        .count();
    assert_eq!(wins, 1, "exactly one accept may win: {:?}", results);

    // The loser saw a conflict it can report, not silent success.
    let loss = results
        .iter()
        .find(|r| !matches!(r, Ok(Outcome::Applied(_))))
        .unwrap();
    assert!(matches!(
        loss,
        Err(SwapError::EdgeNotActive(_))
            | Err(SwapError::StaleSwapState(_))
            | Err(SwapError::ConcurrentModification)
    ));

    let auction = h.store.get_swap(auction.id).await.unwrap().unwrap();
    assert_eq!(auction.status, SwapStatus::Matched);
}

#[tokio::test]
async fn test_cancel_frees_both_slots() {
    let h = harness(false);
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let (_, target) = listed_swap(&h, SwapMode::OneForOne, None).await;
    let edge = h
        .graph
        .create_target(source.id, target.id, proposer)
        .await
        .unwrap();

    assert!(h
        .graph
        .cancel_target(edge.id, proposer)
        .await
        .unwrap()
        .is_applied());
    // Repeat cancel is an idempotent no-op.
    assert!(!h
        .graph
        .cancel_target(edge.id, proposer)
        .await
        .unwrap()
        .is_applied());

    // Both endpoints can engage again.
    let (_, fresh) = listed_swap(&h, SwapMode::OneForOne, None).await;
    h.graph
        .create_target(source.id, fresh.id, proposer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_closed_auction_window_blocks_targeting() {
    let h = harness(false);
    let closed = AuctionWindow {
        starts_at: Utc::now() - chrono::Duration::days(7),
        ends_at: Utc::now() - chrono::Duration::hours(1),
    };
    let (_, auction) = listed_swap(&h, SwapMode::Auction, Some(closed)).await;
    let (proposer, source) = listed_swap(&h, SwapMode::OneForOne, None).await;

    let err = h
        .graph
        .create_target(source.id, auction.id, proposer)
        .await
        .unwrap_err();
    assert!(matches!(err, SwapError::TargetNotActive(id) if id == auction.id));
}
