//! REST API layer.
//!
//! Exposes the GPU arbiter under the stable paths the core promises
//! (`/gpu/status`, `/gpu/allocate`, `/gpu/release`, `/gpu/release-all`,
//! `/gpu/recommend`, `/gpu/can-run-parallel`) plus the execute/cancel/
//! state surface needed to drive the engine remotely.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use response::{ErrorResponse, SuccessResponse};
pub use routes::create_router;
