//! HTTP surface over the workflow execution core: the GPU arbiter's
//! stable API paths, plus the minimal execute/cancel/state endpoints
//! needed to drive the engine from outside the process.
//!
//! A FastAPI-like router that dispatches `llm_process`, `tool`, and RAG
//! node calls into external providers lives outside this crate; it
//! would be built against [`workflow_core::NodeContract`] the same way
//! [`workflow_nodes`] is.

pub mod api;
pub mod config;
pub mod state;

pub use api::routes::create_router;
pub use state::AppState;
