//! HTTP handlers, organized by resource.

pub mod gpu;
pub mod health;
pub mod workflows;

pub use gpu::{allocate, can_run_parallel, recommend, release, release_all, status};
pub use health::health;
pub use workflows::{cancel, execute, get_state, node_types};
