use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use stayswap_domain::SwapTarget;
use stayswap_match::Outcome;
use uuid::Uuid;

use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub source_swap_id: Uuid,
    pub target_swap_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RejectTargetRequest {
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/targets
/// Propose a swap by pointing one swap at another.
pub async fn create_target(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(req): Json<CreateTargetRequest>,
) -> Result<(StatusCode, Json<SwapTarget>), ApiError> {
    let edge = state
        .graph
        .create_target(req.source_swap_id, req.target_swap_id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

/// POST /v1/targets/{id}/accept
/// Accept an incoming proposal, matching both swaps.
///
/// A repeated accept of an already-accepted edge answers 200 with
/// `"applied": false` rather than an error.
pub async fn accept_target(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(edge_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.engine.accept(edge_id, user_id).await? {
        Outcome::Applied(record) => Ok(Json(json!({
            "applied": true,
            "match": record,
        }))),
        Outcome::AlreadyApplied => Ok(Json(json!({ "applied": false }))),
    }
}

/// POST /v1/targets/{id}/reject
/// Reject an incoming proposal. The body is optional; it may carry a reason.
pub async fn reject_target(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(edge_id): Path<Uuid>,
    body: Option<Json<RejectTargetRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reason = body.and_then(|Json(req)| req.reason);
    let outcome = state.engine.reject(edge_id, user_id, reason).await?;
    Ok(Json(json!({ "applied": outcome.is_applied() })))
}

/// POST /v1/targets/{id}/cancel
/// Withdraw a proposal; open to the proposer and to the target swap's owner.
pub async fn cancel_target(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(edge_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state.graph.cancel_target(edge_id, user_id).await?;
    Ok(Json(json!({ "applied": outcome.is_applied() })))
}
