//! Health check endpoint handler.

use axum::extract::State;

use crate::api::{models::HealthResponse, response};
use crate::state::AppState;

/// Handler for GET /health. Reports whether a GPU arbiter is configured
/// on this host alongside the basic liveness status.
pub async fn health(State(app_state): State<AppState>) -> impl axum::response::IntoResponse {
    let status = if app_state.arbiter.is_some() { "ok" } else { "ok (no gpu arbiter)" };
    response::ok(HealthResponse::new(status))
}
