//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers;
use crate::api::middleware::{cors_layer, logging_layer};
use crate::state::AppState;

/// Build the complete API router.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/gpu/status", get(handlers::status))
        .route("/gpu/allocate", post(handlers::allocate))
        .route("/gpu/release", post(handlers::release))
        .route("/gpu/release-all", post(handlers::release_all))
        .route("/gpu/recommend", post(handlers::recommend))
        .route("/gpu/can-run-parallel", get(handlers::can_run_parallel))
        .route("/workflows/execute", post(handlers::execute))
        .route("/workflows/:execution_id", get(handlers::get_state))
        .route("/workflows/:execution_id/cancel", post(handlers::cancel))
        .route("/node-types", get(handlers::node_types))
        .layer(cors_layer())
        .layer(logging_layer())
        .with_state(app_state)
}

#[cfg(test)]
pub fn create_test_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/gpu/status", get(handlers::status))
        .route("/gpu/allocate", post(handlers::allocate))
        .route("/gpu/release", post(handlers::release))
        .route("/gpu/release-all", post(handlers::release_all))
        .route("/gpu/recommend", post(handlers::recommend))
        .route("/gpu/can-run-parallel", get(handlers::can_run_parallel))
        .route("/workflows/execute", post(handlers::execute))
        .route("/workflows/:execution_id", get(handlers::get_state))
        .route("/workflows/:execution_id/cancel", post(handlers::cancel))
        .route("/node-types", get(handlers::node_types))
        .with_state(app_state)
}
