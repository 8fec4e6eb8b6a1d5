use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod events;
pub mod history;
pub mod state;
pub mod swaps;
pub mod targets;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
            HeaderName::from_static(auth::USER_ID_HEADER),
        ]);

    Router::new()
        .route("/v1/swaps", post(swaps::create_swap))
        .route("/v1/swaps/{id}/card", get(swaps::get_swap_card))
        .route("/v1/swaps/{id}/retarget", post(swaps::retarget))
        .route("/v1/targets", post(targets::create_target))
        .route("/v1/targets/{id}/accept", post(targets::accept_target))
        .route("/v1/targets/{id}/reject", post(targets::reject_target))
        .route("/v1/targets/{id}/cancel", post(targets::cancel_target))
        .route("/v1/history", get(history::query_history))
        .route("/v1/events/stream", get(events::stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
