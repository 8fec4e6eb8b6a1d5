use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stayswap_domain::{AuctionWindow, Swap, SwapMode, SwapTarget};
use stayswap_match::SwapCard;
use uuid::Uuid;

use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSwapRequest {
    pub booking_id: Uuid,
    pub mode: SwapMode,
    pub auction_window: Option<AuctionWindow>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RetargetRequest {
    pub new_target_swap_id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/swaps
/// List a booking for swapping.
pub async fn create_swap(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(req): Json<CreateSwapRequest>,
) -> Result<(StatusCode, Json<Swap>), ApiError> {
    let swap = state
        .swaps
        .create_swap(
            req.booking_id,
            req.mode,
            req.auction_window,
            req.expires_at,
            user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(swap)))
}

/// GET /v1/swaps/{id}/card
/// The swap with its live edges and per-proposal compatibility reports.
pub async fn get_swap_card(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(swap_id): Path<Uuid>,
) -> Result<Json<SwapCard>, ApiError> {
    let card = state.cards.swap_card(swap_id, user_id).await?;
    Ok(Json(card))
}

/// POST /v1/swaps/{id}/retarget
/// Atomically swing the swap's outgoing edge at a new target.
pub async fn retarget(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(swap_id): Path<Uuid>,
    Json(req): Json<RetargetRequest>,
) -> Result<Json<SwapTarget>, ApiError> {
    let edge = state
        .graph
        .retarget(swap_id, req.new_target_swap_id, user_id)
        .await?;
    Ok(Json(edge))
}
