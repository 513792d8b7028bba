//! Built-in node types for the workflow execution core.
//!
//! A bare [`workflow_core::NodeRegistry`] knows nothing until something
//! registers node types into it. This crate supplies the small,
//! side-effect-bounded set useful on their own or as a starting point
//! before a host application registers `llm_process`, `tool`, or RAG
//! node types of its own; those remain the host's responsibility, not
//! this crate's.
//!
//! - **[`nodes::DataSourceNode`]** - emits a configured literal value
//! - **[`nodes::IdentityNode`]** - passes its input straight through
//! - **[`nodes::DelayNode`]** - sleeps, cancellably, for a configured duration
//! - **[`nodes::MergeNode`]** - combines every input port into one object
//! - **[`nodes::FailingNode`]** - fails on purpose, for retry/error-path tests

pub mod nodes;

pub use nodes::{DataSourceNode, DelayNode, FailingNode, IdentityNode, MergeNode};
