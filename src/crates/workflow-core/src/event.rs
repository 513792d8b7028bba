//! Execution events and the bus that distributes them.
//!
//! Two consumption styles are supported side by side: synchronous
//! handlers invoked inline as events are published (for logging/metrics
//! that must never be skipped), and a bounded broadcast channel for
//! streaming consumers that can tolerate drops under backpressure. A slow
//! streaming subscriber never blocks node execution: once its buffer is
//! full the oldest event is dropped and a running counter records how
//! many were lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The fixed set of event type tags the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowStarted,
    LayerStarted,
    NodeStarted,
    NodeCompleted,
    NodeError,
    NodeTimeout,
    LayerCompleted,
    WorkflowCompleted,
    WorkflowFailed,
    WorkflowError,
}

/// One observable, append-only occurrence during a run. Handlers must not
/// mutate an event they receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub event_type: EventType,
    pub workflow_id: String,
    pub execution_id: String,
    pub node_id: Option<String>,
    pub data: JsonValue,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    fn new(
        event_type: EventType,
        workflow_id: impl Into<String>,
        execution_id: impl Into<String>,
        node_id: Option<String>,
        data: JsonValue,
        now: DateTime<Utc>,
    ) -> Self {
        ExecutionEvent {
            event_type,
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            node_id,
            data,
            timestamp: now,
        }
    }

    pub fn workflow_started(workflow_id: &str, execution_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(EventType::WorkflowStarted, workflow_id, execution_id, None, json!({}), now)
    }

    pub fn layer_started(workflow_id: &str, execution_id: &str, layer: usize, nodes: &[String], now: DateTime<Utc>) -> Self {
        Self::new(
            EventType::LayerStarted,
            workflow_id,
            execution_id,
            None,
            json!({ "layer": layer, "nodes": nodes }),
            now,
        )
    }

    pub fn layer_completed(workflow_id: &str, execution_id: &str, layer: usize, now: DateTime<Utc>) -> Self {
        Self::new(EventType::LayerCompleted, workflow_id, execution_id, None, json!({ "layer": layer }), now)
    }

    pub fn node_started(workflow_id: &str, execution_id: &str, node_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(EventType::NodeStarted, workflow_id, execution_id, Some(node_id.to_string()), json!({}), now)
    }

    pub fn node_completed(
        workflow_id: &str,
        execution_id: &str,
        node_id: &str,
        outputs: &crate::value::PortValues,
        duration_ms: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            EventType::NodeCompleted,
            workflow_id,
            execution_id,
            Some(node_id.to_string()),
            json!({ "outputs": outputs, "duration_ms": duration_ms }),
            now,
        )
    }

    pub fn node_error(workflow_id: &str, execution_id: &str, node_id: &str, error: &str, now: DateTime<Utc>) -> Self {
        Self::new(
            EventType::NodeError,
            workflow_id,
            execution_id,
            Some(node_id.to_string()),
            json!({ "error": error }),
            now,
        )
    }

    pub fn node_timeout(workflow_id: &str, execution_id: &str, node_id: &str, timeout_seconds: u64, now: DateTime<Utc>) -> Self {
        Self::new(
            EventType::NodeTimeout,
            workflow_id,
            execution_id,
            Some(node_id.to_string()),
            json!({ "timeout_seconds": timeout_seconds }),
            now,
        )
    }

    pub fn workflow_completed(workflow_id: &str, execution_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(EventType::WorkflowCompleted, workflow_id, execution_id, None, json!({ "status": "completed" }), now)
    }

    pub fn workflow_failed(workflow_id: &str, execution_id: &str, status: &str, error: Option<&str>, now: DateTime<Utc>) -> Self {
        Self::new(
            EventType::WorkflowFailed,
            workflow_id,
            execution_id,
            None,
            json!({ "status": status, "error": error }),
            now,
        )
    }

    pub fn workflow_error(workflow_id: &str, execution_id: &str, error: &str, now: DateTime<Utc>) -> Self {
        Self::new(EventType::WorkflowError, workflow_id, execution_id, None, json!({ "error": error }), now)
    }
}

type Handler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Publishes execution events to synchronous handlers, in registration
/// order, and to any number of streaming subscribers.
pub struct EventBus {
    handlers: parking_lot::RwLock<Vec<Handler>>,
    sender: broadcast::Sender<ExecutionEvent>,
    dropped: AtomicU64,
}

impl EventBus {
    /// `capacity` bounds the broadcast channel; publishing past it drops
    /// the oldest buffered event for subscribers that have fallen behind.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { handlers: parking_lot::RwLock::new(Vec::new()), sender, dropped: AtomicU64::new(0) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn on_event(&self, handler: Handler) {
        self.handlers.write().push(handler);
    }

    /// Number of events dropped because some subscriber's buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn publish(&self, event: ExecutionEvent) {
        for handler in self.handlers.read().iter() {
            // A panicking handler must not take down the engine or stop
            // later handlers from observing the event.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&event)));
            if let Err(panic) = result {
                tracing::warn!(?panic, "event handler panicked");
            }
        }
        let was_full = self.sender.len() >= self.sender.capacity();
        if self.sender.send(event).is_ok() && was_full {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(1024)
    }
}
