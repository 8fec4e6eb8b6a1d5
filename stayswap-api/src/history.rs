use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stayswap_domain::{
    EventFilter, EventSeverity, Page, PageRequest, SortOrder, TargetEvent, TargetEventKind,
};
use uuid::Uuid;

use crate::auth::ActingUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Query-string shape for GET /v1/history. Filter fields are conjunctive;
/// pagination falls back to the engine defaults when omitted.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub actor: Option<Uuid>,
    pub swap_id: Option<Uuid>,
    pub edge_id: Option<Uuid>,
    pub kind: Option<TargetEventKind>,
    pub severity: Option<EventSeverity>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<SortOrder>,
}

/// GET /v1/history
/// Paginated read over the append-only edge transition log.
pub async fn query_history(
    State(state): State<AppState>,
    ActingUser(_user_id): ActingUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Page<TargetEvent>>, ApiError> {
    let filter = EventFilter {
        actor: query.actor,
        swap_id: query.swap_id,
        edge_id: query.edge_id,
        kind: query.kind,
        severity: query.severity,
        occurred_after: query.occurred_after,
        occurred_before: query.occurred_before,
    };

    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
        sort: query.sort.unwrap_or(defaults.sort),
    };

    let result = state.history.query(&filter, &page).await?;
    Ok(Json(result))
}
