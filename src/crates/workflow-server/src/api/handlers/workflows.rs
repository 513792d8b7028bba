//! Handlers that drive the workflow execution core from outside the
//! process: submit a graph for execution, inspect its state, cancel it.

use axum::extract::{Path, State};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::workflow::{CancelResponse, ExecuteRequest, NodeTypeDto};
use crate::api::response;
use crate::state::AppState;

pub async fn execute(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ExecuteRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let result = state.engine.execute(&req.graph, req.variables, req.execution_id).await?;
    Ok(response::ok(result))
}

pub async fn get_state(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    match state.engine.get_state(&execution_id) {
        Some(workflow_state) => Ok(response::ok(workflow_state)),
        None => Err(ApiError::NotFound(format!("no execution with id {execution_id}"))),
    }
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if !state.engine.cancel(&execution_id) {
        return Err(ApiError::NotFound(format!("no running execution with id {execution_id}")));
    }
    Ok(response::ok(CancelResponse { cancelled: true }))
}

/// Lists every node type currently registered on this process, for
/// clients that want to discover what a workflow may reference before
/// submitting it.
pub async fn node_types(State(state): State<AppState>) -> ApiResult<impl axum::response::IntoResponse> {
    let schemas: Vec<NodeTypeDto> =
        state.engine.registry().all_schemas().into_iter().map(NodeTypeDto::from).collect();
    Ok(response::ok(schemas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use workflow_core::{Engine, EngineConfig, NodeRegistry, WorkflowGraph, WorkflowNode};
    use workflow_nodes::DataSourceNode;
    use workflow_core::value::PortValue;

    fn state_with_registry() -> AppState {
        let registry = NodeRegistry::new();
        registry.register(DataSourceNode::schema(), Arc::new(DataSourceNode::new(PortValue::Integer(1))));
        AppState::new(Arc::new(Engine::new(Arc::new(registry), EngineConfig::default())), None)
    }

    #[tokio::test]
    async fn execute_runs_a_graph_to_completion() {
        let state = state_with_registry();
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "data_source"), now).unwrap();
        let req = ExecuteRequest { graph, variables: None, execution_id: None };
        assert!(execute(State(state), axum::Json(req)).await.is_ok());
    }

    #[tokio::test]
    async fn get_state_for_an_unknown_execution_is_not_found() {
        let state = state_with_registry();
        let err = get_state(State(state), Path("missing".to_string())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_of_an_unknown_execution_is_not_found() {
        let state = state_with_registry();
        let err = cancel(State(state), Path("missing".to_string())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn node_types_lists_every_registered_schema() {
        let state = state_with_registry();
        let response = node_types(State(state)).await;
        assert!(response.is_ok());
    }
}
