//! Error taxonomy for workflow validation and execution.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised while validating or executing a workflow graph.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The graph itself is structurally invalid: a cycle, a dangling edge,
    /// an edge between incompatible ports, or more than one node wired to
    /// a single-valued input port.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// A node references a type name absent from the registry.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Inputs handed to a node did not satisfy its declared schema.
    #[error("validation error on node {node}: {message}")]
    ValidationError { node: String, message: String },

    /// The node ran and returned `success: false`.
    #[error("node {node} reported failure: {message}")]
    NodeReportedError { node: String, message: String },

    /// The node's future panicked or returned an `Err`.
    #[error("node {node} raised an exception: {message}")]
    NodeException { node: String, message: String },

    /// A node did not complete within its allotted timeout.
    #[error("node {node} timed out after {duration_ms}ms")]
    Timeout { node: String, duration_ms: u64 },

    /// Execution was cancelled before completion.
    #[error("execution {execution_id} was cancelled")]
    Cancelled { execution_id: String },

    /// An internal engine invariant was violated; not attributable to a
    /// single node.
    #[error("engine error: {0}")]
    EngineError(String),
}

impl WorkflowError {
    pub fn invalid_workflow(message: impl Into<String>) -> Self {
        WorkflowError::InvalidWorkflow(message.into())
    }

    pub fn validation(node: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::ValidationError {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn node_exception(node: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::NodeException {
            node: node.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::InvalidWorkflow(format!("malformed wire payload: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_include_the_offending_node() {
        let err = WorkflowError::node_exception("n", "boom");
        assert!(err.to_string().contains("n"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn invalid_workflow_and_validation_constructors_wrap_their_messages() {
        assert!(WorkflowError::invalid_workflow("cycle").to_string().contains("cycle"));
        assert!(WorkflowError::validation("n", "bad").to_string().contains("bad"));
    }
}
