//! # workflow-core - a concurrent, DAG-based execution engine for agent workflows
//!
//! `workflow-core` schedules a directed acyclic graph of typed nodes to
//! completion: it plans the graph into layers that can run with internal
//! parallelism, gathers each node's inputs from its completed upstream
//! neighbors, and drives execution with a bounded worker pool, per-node
//! timeouts, retries with backoff, and cooperative cancellation.
//!
//! ## Core Concepts
//!
//! ### 1. Node Registry and Contract
//!
//! Node *types* are registered once, process-wide, in a [`NodeRegistry`]
//! under a [`NodeSchema`] describing their typed input/output ports.
//! Behavior is supplied by anything implementing [`NodeContract`]; a
//! workflow graph references node types by name and the engine resolves
//! the contract at execution time.
//!
//! ### 2. Graph Model
//!
//! A [`WorkflowGraph`] is an arena of [`WorkflowNode`]s and
//! [`WorkflowEdge`]s. `validate()` rejects cycles, dangling references,
//! port type mismatches, and multiply-bound input ports before the graph
//! is ever planned.
//!
//! ### 3. Planning
//!
//! [`planner::plan`] runs Kahn's algorithm over the non-disabled subgraph
//! once, up front, producing an [`planner::ExecutionPlan`] of layers:
//! every node in layer `N` depends only on nodes in layers `0..N`, and
//! nodes within a layer may run concurrently.
//!
//! ### 4. Engine
//!
//! [`Engine::execute`] drives one run of a graph to a terminal
//! [`WorkflowState`], publishing [`ExecutionEvent`]s to an [`EventBus`] at
//! every stage: workflow/layer/node start and completion, errors,
//! timeouts. Concurrency within a layer is bounded by
//! [`EngineConfig::max_concurrent_nodes`]; failed nodes are retried with
//! geometric backoff up to `max_retries` when they self-report as
//! retryable, and a run can be cancelled cooperatively between layers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use workflow_core::{Engine, EngineConfig, NodeRegistry, WorkflowGraph, WorkflowNode, WorkflowEdge};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(NodeRegistry::new());
//!     // registry.register(schema, Arc::new(my_node));
//!
//!     let now = chrono::Utc::now();
//!     let mut graph = WorkflowGraph::new("wf-1", "demo", now);
//!     graph.add_node(WorkflowNode::new("a", "data_source"), now).unwrap();
//!
//!     let engine = Engine::new(registry, EngineConfig::default());
//!     let state = engine.execute(&graph, None, None).await.unwrap();
//!     println!("status: {:?}", state.status);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`value`] - typed port values ([`value::PortValue`], [`value::PortType`])
//! - [`schema`] - [`NodeSchema`] and [`schema::Port`] declarations
//! - [`node`] - the [`NodeContract`] trait, [`node::ExecutionContext`], [`node::ExecutionResult`]
//! - [`registry`] - [`NodeRegistry`], the process-wide node type directory
//! - [`graph`] - [`WorkflowGraph`] and structural validation
//! - [`planner`] - topological layering ([`planner::plan`])
//! - [`cancel`] - cooperative cancellation ([`cancel::CancelSignal`])
//! - [`retry`] - [`retry::RetryPolicy`] and [`retry::RetryState`]
//! - [`state`] - per-run execution state ([`WorkflowState`], [`ExecutionStateStore`])
//! - [`event`] - [`ExecutionEvent`] and the [`EventBus`]
//! - [`engine`] - the scheduler ([`Engine`], [`EngineConfig`])
//! - [`wire`] - JSON/YAML (de)serialization of a [`WorkflowGraph`]
//! - [`error`] - [`WorkflowError`] and the crate's [`error::Result`] alias

pub mod cancel;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod node;
pub mod planner;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod state;
pub mod value;
pub mod wire;

pub use cancel::CancelSignal;
pub use engine::{Engine, EngineConfig};
pub use error::{Result, WorkflowError};
pub use event::{EventBus, EventType, ExecutionEvent};
pub use graph::{GraphMetadata, WorkflowEdge, WorkflowGraph, WorkflowNode};
pub use node::{ExecutionContext, ExecutionResult, NodeContract};
pub use planner::ExecutionPlan;
pub use registry::NodeRegistry;
pub use retry::{RetryPolicy, RetryState};
pub use schema::{NodeSchema, Port};
pub use state::{ExecutionStateStore, NodeExecutionState, NodeStatus, RunStatus, WorkflowState};
pub use value::{PortType, PortValue, PortValues};
