//! Execution state: per-node status plus the aggregate state of one
//! workflow run.
//!
//! State lives entirely in memory for the lifetime of an [`ExecutionId`];
//! there is no checkpoint/resume or cross-process persistence here, by
//! design.

use crate::value::PortValues;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type ExecutionId = String;

/// Lifecycle status of one node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped | NodeStatus::Cancelled
        )
    }
}

/// Recorded state of one node's execution within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionState {
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub inputs: PortValues,
    #[serde(default)]
    pub outputs: PortValues,
    pub error: Option<String>,
    pub error_traceback: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: usize,
}

impl NodeExecutionState {
    pub fn pending(node_id: impl Into<String>) -> Self {
        NodeExecutionState {
            node_id: node_id.into(),
            status: NodeStatus::Pending,
            inputs: PortValues::new(),
            outputs: PortValues::new(),
            error: None,
            error_traceback: None,
            started_at: None,
            completed_at: None,
            attempts: 0,
        }
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// The full observable state of one workflow run: every node's state plus
/// the run's own status. Holds the authoritative outputs used to satisfy
/// downstream node inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    pub execution_id: ExecutionId,
    pub status: RunStatus,
    #[serde(default)]
    pub variables: PortValues,
    pub node_states: HashMap<String, NodeExecutionState>,
    pub total_layers: usize,
    pub current_layer: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Thread-safe store of in-flight and completed run state.
///
/// Mirrors a tool/session registry: a concurrent map keyed by execution
/// id, with each run's state behind its own lock so unrelated runs never
/// contend on the same entry.
#[derive(Default)]
pub struct ExecutionStateStore {
    runs: DashMap<ExecutionId, Arc<parking_lot::RwLock<WorkflowState>>>,
}

impl ExecutionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, state: WorkflowState) {
        let execution_id = state.execution_id.clone();
        match self.runs.get(&execution_id) {
            Some(existing) => *existing.write() = state,
            None => {
                self.runs.insert(execution_id, Arc::new(parking_lot::RwLock::new(state)));
            }
        }
    }

    pub fn get(&self, execution_id: &str) -> Option<WorkflowState> {
        self.runs.get(execution_id).map(|r| r.read().clone())
    }

    pub fn remove(&self, execution_id: &str) -> Option<WorkflowState> {
        self.runs.remove(execution_id).map(|(_, v)| v.read().clone())
    }

    pub fn list_by_workflow(&self, workflow_id: &str) -> Vec<WorkflowState> {
        self.runs
            .iter()
            .map(|entry| entry.value().read().clone())
            .filter(|s| s.workflow_id == workflow_id)
            .collect()
    }

    pub fn is_running(&self, execution_id: &str) -> bool {
        self.runs
            .get(execution_id)
            .map(|r| r.read().status == RunStatus::Running)
            .unwrap_or(false)
    }

    /// Atomically mutate the state for `execution_id`, if it exists.
    pub fn with_mut<R>(&self, execution_id: &str, f: impl FnOnce(&mut WorkflowState) -> R) -> Option<R> {
        self.runs.get(execution_id).map(|run| f(&mut run.write()))
    }
}

impl Clone for WorkflowState {
    fn clone(&self) -> Self {
        WorkflowState {
            workflow_id: self.workflow_id.clone(),
            execution_id: self.execution_id.clone(),
            status: self.status,
            variables: self.variables.clone(),
            node_states: self.node_states.clone(),
            total_layers: self.total_layers,
            current_layer: self.current_layer,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error: self.error.clone(),
        }
    }
}
