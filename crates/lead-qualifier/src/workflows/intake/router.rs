use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::history::ProcessingHistory;
use super::jurisdiction::{JurisdictionCatalog, JurisdictionError};
use crate::error::AppError;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct StatusState {
    pub history: Arc<ProcessingHistory>,
    pub catalog: Arc<JurisdictionCatalog>,
}

/// Read-only endpoints exposing processing history and jurisdiction reference data.
pub fn status_router(history: Arc<ProcessingHistory>, catalog: Arc<JurisdictionCatalog>) -> Router {
    Router::new()
        .route("/api/v1/leads/history", get(history_handler))
        .route("/api/v1/leads/stats", get(stats_handler))
        .route("/api/v1/jurisdictions/:code", get(jurisdiction_handler))
        .with_state(StatusState { history, catalog })
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<usize>,
}

pub(crate) async fn history_handler(
    State(state): State<StatusState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.history.recent(limit);
    (StatusCode::OK, axum::Json(json!({ "entries": entries }))).into_response()
}

pub(crate) async fn stats_handler(State(state): State<StatusState>) -> Response {
    (StatusCode::OK, axum::Json(state.history.stats())).into_response()
}

/// Unknown codes answer 404 with the available codes; unreadable data goes through `AppError`.
pub(crate) async fn jurisdiction_handler(
    State(state): State<StatusState>,
    Path(code): Path<String>,
) -> Result<Response, AppError> {
    match state.catalog.profile_for(&code) {
        Ok(profile) => Ok((StatusCode::OK, axum::Json(profile.as_ref().clone())).into_response()),
        Err(JurisdictionError::NotFound(code)) => {
            let payload = json!({
                "error": format!("no jurisdiction data for '{code}'"),
                "available": state.catalog.available_codes(),
            });
            Ok((StatusCode::NOT_FOUND, axum::Json(payload)).into_response())
        }
        Err(other) => Err(other.into()),
    }
}
