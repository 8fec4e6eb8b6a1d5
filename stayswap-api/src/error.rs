use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stayswap_match::SwapError;

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    Swap(SwapError),
    Internal(anyhow::Error),
}

impl From<SwapError> for ApiError {
    fn from(err: SwapError) -> Self {
        ApiError::Swap(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

fn swap_error_status(err: &SwapError) -> StatusCode {
    match err {
        SwapError::OwnershipMismatch { .. } => StatusCode::FORBIDDEN,

        SwapError::SwapNotFound(_)
        | SwapError::EdgeNotFound(_)
        | SwapError::BookingNotFound(_)
        | SwapError::MatchNotFound(_) => StatusCode::NOT_FOUND,

        // Conflicts: either state another caller already claimed, or a race
        // the caller should re-fetch and retry.
        SwapError::DuplicateSwap(_)
        | SwapError::SourceAlreadyTargeting(_)
        | SwapError::TargetExclusivityViolation(_)
        | SwapError::EdgeNotActive(_)
        | SwapError::StaleSwapState(_)
        | SwapError::ConcurrentModification => StatusCode::CONFLICT,

        SwapError::SelfTarget
        | SwapError::SourceNotActive(_)
        | SwapError::TargetNotActive(_)
        | SwapError::InvalidTransition { .. }
        | SwapError::InvalidBookingState(_)
        | SwapError::MissingAuctionWindow
        | SwapError::InvalidAuctionWindow(_)
        | SwapError::InvalidExpiry => StatusCode::BAD_REQUEST,

        SwapError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Swap(err) => {
                let status = swap_error_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
