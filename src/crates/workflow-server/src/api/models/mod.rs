//! Request/response DTOs for the HTTP surface.

pub mod gpu;
pub mod health;
pub mod workflow;

pub use gpu::{
    AllocateRequest, AllocateResponse, CanRunParallelQuery, ModelRequestDto, RecommendRequest,
    RecommendResponse, ReleaseAllResponse, ReleaseRequest, ReleaseResponse,
};
pub use health::HealthResponse;
pub use workflow::{CancelResponse, ExecuteRequest, NodeTypeDto, NodeTypePortDto};
