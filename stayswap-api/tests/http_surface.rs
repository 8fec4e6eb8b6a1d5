//! Router-level tests over the in-memory store: header extraction, status
//! mapping, and the create/card round trip.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use stayswap_api::{app, AppState};
use stayswap_core::identity::DerivedOwnershipResolver;
use stayswap_core::ledger::MockLedgerMint;
use stayswap_core::notify::BroadcastNotifier;
use stayswap_domain::{
    AccommodationType, Booking, BookingStatus, DateRange,
};
use stayswap_match::{
    ResolutionEngine, SwapCards, SwapLocks, SwapService, TargetingGraph, TargetingHistory,
};
use stayswap_shared::events::MintResultEvent;
use stayswap_store::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

const LOCK_WAIT: Duration = Duration::from_millis(500);

fn test_state() -> (AppState, Arc<MemoryStore>, tokio::sync::mpsc::Receiver<MintResultEvent>) {
    let store = Arc::new(MemoryStore::new());
    let ownership = Arc::new(DerivedOwnershipResolver::new(store.clone()));
    let (notify_tx, _) = tokio::sync::broadcast::channel(16);
    let notifier = Arc::new(BroadcastNotifier::new(notify_tx.clone()));
    let (mint_tx, mint_rx) = tokio::sync::mpsc::channel(16);
    let mint = Arc::new(MockLedgerMint::new(mint_tx, false));
    let locks = SwapLocks::new();

    let state = AppState {
        swaps: Arc::new(SwapService::new(
            store.clone(),
            store.clone(),
            ownership.clone(),
        )),
        graph: Arc::new(TargetingGraph::new(
            store.clone(),
            store.clone(),
            ownership.clone(),
            store.clone(),
            notifier.clone(),
            locks.clone(),
            LOCK_WAIT,
        )),
        engine: Arc::new(ResolutionEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            ownership.clone(),
            store.clone(),
            notifier,
            mint,
            locks,
            LOCK_WAIT,
        )),
        cards: Arc::new(SwapCards::new(
            store.clone(),
            store.clone(),
            store.clone(),
            ownership,
        )),
        history: Arc::new(TargetingHistory::new(store.clone())),
        notifications: notify_tx,
    };
    (state, store, mint_rx)
}

fn seed_booking(store: &MemoryStore, owner: Uuid) -> Booking {
    let booking = Booking {
        id: Uuid::new_v4(),
        owner_id: owner,
        location: None,
        date_range: DateRange {
            start: chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2026, 10, 8).unwrap(),
        },
        original_price_cents: 90_000,
        swap_value_cents: 90_000,
        currency: "EUR".to_string(),
        accommodation_type: AccommodationType::Cabin,
        guest_capacity: Some(2),
        status: BookingStatus::Available,
    };
    store.seed_booking(booking.clone());
    booking
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let (state, _, _mint_rx) = test_state();
    let response = app(state)
        .oneshot(
            Request::get(format!("/v1/swaps/{}/card", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_user_header_is_unauthorized() {
    let (state, _, _mint_rx) = test_state();
    let response = app(state)
        .oneshot(
            Request::get("/v1/history")
                .header("X-User-Id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_swap_and_fetch_card() {
    let (state, store, _mint_rx) = test_state();
    let router = app(state);
    let owner = Uuid::new_v4();
    let booking = seed_booking(&store, owner);

    let request_body = json!({
        "booking_id": booking.id,
        "mode": "ONE_FOR_ONE",
        "expires_at": (Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
    });
    let response = router
        .clone()
        .oneshot(
            Request::post("/v1/swaps")
                .header("X-User-Id", owner.to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let swap = body_json(response.into_body()).await;
    let swap_id = swap["id"].as_str().unwrap().to_string();
    assert_eq!(swap["status"], "ACTIVE");

    let response = router
        .oneshot(
            Request::get(format!("/v1/swaps/{}/card", swap_id))
                .header("X-User-Id", owner.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let card = body_json(response.into_body()).await;
    assert_eq!(card["viewer_is_owner"], true);
    assert!(card["incoming_targets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_swap_card_is_not_found() {
    let (state, _, _mint_rx) = test_state();
    let response = app(state)
        .oneshot(
            Request::get(format!("/v1/swaps/{}/card", Uuid::new_v4()))
                .header("X-User-Id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_booking_is_forbidden() {
    let (state, store, _mint_rx) = test_state();
    let booking = seed_booking(&store, Uuid::new_v4());

    let request_body = json!({
        "booking_id": booking.id,
        "mode": "ONE_FOR_ONE",
        "expires_at": (Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
    });
    let response = app(state)
        .oneshot(
            Request::post("/v1/swaps")
                .header("X-User-Id", Uuid::new_v4().to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
