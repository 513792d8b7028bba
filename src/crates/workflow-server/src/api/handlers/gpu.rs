//! Handlers for the GPU arbiter's stable HTTP surface.
//!
//! Every handler here answers 503 when no arbiter is configured on this
//! host, and `allocate` answers 503 rather than a null `gpu_id` when the
//! arbiter cannot admit the request - the HTTP surface never reports
//! "no feasible GPU" as a 200.

use axum::extract::{Query, State};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::gpu::{
    AllocateRequest, AllocateResponse, CanRunParallelQuery, RecommendRequest, RecommendResponse,
    ReleaseAllResponse, ReleaseRequest, ReleaseResponse,
};
use crate::api::response;
use crate::state::AppState;

fn require_arbiter(state: &AppState) -> ApiResult<&std::sync::Arc<gpu_arbiter::GpuArbiter>> {
    state.arbiter.as_ref().ok_or_else(|| ApiError::Unavailable("no GPU arbiter configured on this host".into()))
}

pub async fn status(State(state): State<AppState>) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    Ok(response::ok(arbiter.get_status()))
}

pub async fn allocate(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<AllocateRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    match arbiter.allocate_gpu(&req.model_id, req.vram_required_gb, req.preferred_gpu_id, req.exclusive) {
        Some(gpu_id) => Ok(response::ok(AllocateResponse { gpu_id })),
        None => Err(ApiError::Unavailable(format!("no feasible GPU for model {}", req.model_id))),
    }
}

pub async fn release(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ReleaseRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    let released = arbiter.release_gpu(&req.model_id);
    Ok(response::ok(ReleaseResponse { released }))
}

pub async fn release_all(State(state): State<AppState>) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    let released_count = arbiter.release_all();
    Ok(response::ok(ReleaseAllResponse { released_count }))
}

pub async fn recommend(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<RecommendRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    let models: Vec<gpu_arbiter::ModelRequest> = req.models.into_iter().map(Into::into).collect();
    let recommendations = arbiter.recommend_allocation(&models);
    Ok(response::ok(RecommendResponse { recommendations }))
}

pub async fn can_run_parallel(
    State(state): State<AppState>,
    Query(query): Query<CanRunParallelQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let arbiter = require_arbiter(&state)?;
    let models = query.parse();
    let can_run_parallel = arbiter.can_run_parallel(&models);
    Ok(response::ok(serde_json::json!({ "can_run_parallel": can_run_parallel })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpu_arbiter::{AllocationStrategy, GpuArbiter, GpuRecord};

    fn state_with_arbiter() -> AppState {
        let arbiter = GpuArbiter::new(vec![GpuRecord::new(0, 24.0, "test-gpu")], AllocationStrategy::default());
        AppState::new(
            std::sync::Arc::new(workflow_core::Engine::new(
                std::sync::Arc::new(workflow_core::NodeRegistry::new()),
                workflow_core::EngineConfig::default(),
            )),
            Some(std::sync::Arc::new(arbiter)),
        )
    }

    #[tokio::test]
    async fn status_without_an_arbiter_is_unavailable() {
        let state = AppState::new(
            std::sync::Arc::new(workflow_core::Engine::new(
                std::sync::Arc::new(workflow_core::NodeRegistry::new()),
                workflow_core::EngineConfig::default(),
            )),
            None,
        );
        let err = status(State(state)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }

    #[tokio::test]
    async fn allocate_succeeds_when_capacity_is_available() {
        let state = state_with_arbiter();
        let req = AllocateRequest {
            model_id: "m1".into(),
            vram_required_gb: Some(4.0),
            preferred_gpu_id: None,
            exclusive: false,
        };
        let result = allocate(State(state), axum::Json(req)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn allocate_reports_unavailable_when_nothing_fits() {
        let state = state_with_arbiter();
        let req = AllocateRequest {
            model_id: "too-big".into(),
            vram_required_gb: Some(1000.0),
            preferred_gpu_id: None,
            exclusive: false,
        };
        let err = allocate(State(state), axum::Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }
}
