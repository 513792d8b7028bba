//! Node contract: the trait a built-in or user-supplied node type implements.

use crate::cancel::CancelSignal;
use crate::value::PortValues;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Read-only context handed to a node's `execute`, plus the cooperative
/// cancellation signal it should poll during long-running work.
#[derive(Clone)]
pub struct ExecutionContext {
    pub workflow_id: String,
    pub execution_id: String,
    pub node_id: String,
    pub variables: PortValues,
    /// The node's own declared `config` map, separate from `inputs`:
    /// values set on the node itself in the graph rather than wired in
    /// from an upstream port.
    pub config: PortValues,
    pub cancel: CancelSignal,
}

impl ExecutionContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Outcome of one node invocation, independent of whether the node threw.
///
/// A node that runs to completion but considers its own work unsuccessful
/// (e.g. a validation node rejecting its input) returns `success: false`
/// with `error`, rather than propagating a Rust panic; the engine turns
/// that into [`crate::error::WorkflowError::NodeReportedError`]. Node
/// authors should set `metadata["retryable"] = true` on failures they
/// consider transient; absent, a failure is treated as permanent.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub outputs: PortValues,
    pub error: Option<String>,
    pub error_traceback: Option<String>,
    pub duration_ms: u64,
    pub metadata: HashMap<String, JsonValue>,
}

impl ExecutionResult {
    pub fn ok(outputs: PortValues, duration_ms: u64) -> Self {
        ExecutionResult {
            success: true,
            outputs,
            error: None,
            error_traceback: None,
            duration_ms,
            metadata: HashMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>, duration_ms: u64) -> Self {
        ExecutionResult {
            success: false,
            outputs: PortValues::new(),
            error: Some(message.into()),
            error_traceback: None,
            duration_ms,
            metadata: HashMap::new(),
        }
    }

    pub fn retryable(mut self) -> Self {
        self.metadata.insert("retryable".to_string(), JsonValue::Bool(true));
        self
    }

    /// Whether the node tagged this failure as transient. Absent metadata
    /// means permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self.metadata.get("retryable"), Some(JsonValue::Bool(true)))
    }
}

/// The executable behavior of a node type.
///
/// Implementations are registered once under a type name in the
/// [`crate::registry::NodeRegistry`] and instantiated by reference from
/// every [`crate::graph::WorkflowNode`] of that type in a workflow. `Err`
/// is reserved for the node panicking or its future resolving to an
/// unexpected Rust error (a `NodeException`); ordinary, expected failures
/// flow through `ExecutionResult::failed` instead.
#[async_trait]
pub trait NodeContract: Send + Sync {
    async fn execute(&self, inputs: PortValues, ctx: ExecutionContext) -> ExecutionResult;
}

impl fmt::Debug for dyn NodeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<node contract>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_carries_no_error() {
        let r = ExecutionResult::ok(PortValues::new(), 5);
        assert!(r.success);
        assert!(r.error.is_none());
        assert!(!r.is_retryable());
    }

    #[test]
    fn failed_result_defaults_to_non_retryable_until_tagged() {
        let r = ExecutionResult::failed("bad input", 3);
        assert!(!r.success);
        assert!(!r.is_retryable());
        let r = r.retryable();
        assert!(r.is_retryable());
    }
}
