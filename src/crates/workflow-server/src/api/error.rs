//! API error types and HTTP response conversion.
//!
//! Maps the core's error taxonomy onto the status codes the HTTP surface
//! promises: validation failures 400, unknown ids 404, an arbiter unable
//! to admit a request 503, anything else 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use workflow_core::WorkflowError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { error: error.into(), message: message.into(), code: code.into() }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unavailable(_) => "UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unavailable(_) => "Unavailable",
            ApiError::Internal(_) => "InternalError",
        }
    }
}

/// Classifies a core error per the HTTP mapping: `InvalidWorkflow`,
/// `UnknownNodeType`, and `ValidationError` are the caller's fault
/// (400); everything else that can surface from `Engine::execute` is
/// treated as internal, since by the time a workflow is running the
/// only remaining failures are per-node and are recorded in
/// `WorkflowState` rather than returned as an `Err`.
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidWorkflow(msg) => ApiError::BadRequest(msg),
            WorkflowError::UnknownNodeType(node_type) => {
                ApiError::BadRequest(format!("unknown node type: {node_type}"))
            }
            WorkflowError::ValidationError { node, message } => {
                ApiError::BadRequest(format!("validation error on node {node}: {message}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());
        tracing::error!("API error: {:?}", body);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("execution xyz".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = ApiError::BadRequest("bad input".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let err = ApiError::Unavailable("no feasible gpu".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_workflow_becomes_bad_request() {
        let err: ApiError = WorkflowError::invalid_workflow("cycle detected").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_error_becomes_internal() {
        let err: ApiError = WorkflowError::EngineError("invariant violated".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
