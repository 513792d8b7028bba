//! Built-in node types: small, side-effect-bounded implementations of
//! [`NodeContract`] used to exercise the engine and to give a workflow
//! somewhere to start before a host application registers its own
//! `llm_process`, `tool`, or RAG-backed node types.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use workflow_core::node::{ExecutionContext, ExecutionResult};
use workflow_core::schema::{NodeSchema, Port};
use workflow_core::value::{PortType, PortValue, PortValues};
use workflow_core::NodeContract;

/// Emits a single configured literal value on its `value` output. Useful
/// as the entry point of a workflow that otherwise has no external input.
/// A graph node can override the value constructed into the registry by
/// setting its own `config.value`; absent that, the constructed default
/// applies.
pub struct DataSourceNode {
    pub value: PortValue,
}

impl DataSourceNode {
    pub fn new(value: PortValue) -> Self {
        DataSourceNode { value }
    }

    pub fn schema() -> NodeSchema {
        NodeSchema::new("data_source")
            .with_display_name("Data Source")
            .with_description("Emits a configured literal value; overridable per graph node via config.value")
            .with_category("data")
            .with_output(Port::new("value", PortType::Any))
    }
}

#[async_trait]
impl NodeContract for DataSourceNode {
    async fn execute(&self, _inputs: PortValues, ctx: ExecutionContext) -> ExecutionResult {
        let value = ctx.config.get("value").cloned().unwrap_or_else(|| self.value.clone());
        let mut outputs = PortValues::new();
        outputs.insert("value".to_string(), value);
        ExecutionResult::ok(outputs, 0)
    }
}

/// Passes its single `in` input through to `out` unchanged. Grounds
/// fan-out/fan-in tests where the interesting behavior lives in the
/// graph shape rather than the node body.
pub struct IdentityNode;

impl IdentityNode {
    pub fn schema() -> NodeSchema {
        NodeSchema::new("identity")
            .with_display_name("Identity")
            .with_description("Passes its input straight through to its output")
            .with_category("control-flow")
            .with_input(Port::new("in", PortType::Any).required())
            .with_output(Port::new("out", PortType::Any))
    }
}

#[async_trait]
impl NodeContract for IdentityNode {
    async fn execute(&self, inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
        let value = inputs.get("in").cloned().unwrap_or(PortValue::Boolean(false));
        let mut outputs = PortValues::new();
        outputs.insert("out".to_string(), value);
        ExecutionResult::ok(outputs, 0)
    }
}

/// Sleeps for a configured duration, polling the cancellation signal
/// between short ticks so a cancel lands promptly instead of waiting out
/// the whole delay. Exists to exercise timeout and cancellation paths.
pub struct DelayNode {
    pub delay: Duration,
}

impl DelayNode {
    pub fn new(delay: Duration) -> Self {
        DelayNode { delay }
    }

    pub fn schema() -> NodeSchema {
        NodeSchema::new("delay")
            .with_display_name("Delay")
            .with_description("Sleeps for a configured duration, cancellably")
            .with_category("control-flow")
            .with_input(Port::new("in", PortType::Any))
            .with_output(Port::new("out", PortType::Any))
    }
}

#[async_trait]
impl NodeContract for DelayNode {
    async fn execute(&self, inputs: PortValues, ctx: ExecutionContext) -> ExecutionResult {
        let tick = Duration::from_millis(10).min(self.delay);
        let mut remaining = self.delay;
        while remaining > Duration::ZERO {
            if ctx.is_cancelled() {
                return ExecutionResult::failed("cancelled during delay", 0);
            }
            let step = tick.min(remaining);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        let mut outputs = PortValues::new();
        if let Some(value) = inputs.get("in") {
            outputs.insert("out".to_string(), value.clone());
        }
        ExecutionResult::ok(outputs, self.delay.as_millis() as u64)
    }
}

/// Merges every input port into a single `merged` object output, keyed
/// by port name. Used for fan-in nodes that combine several upstream
/// branches.
pub struct MergeNode;

impl MergeNode {
    pub fn schema(input_names: &[&str]) -> NodeSchema {
        let mut schema = NodeSchema::new("merge")
            .with_display_name("Merge")
            .with_description("Combines every input port into a single keyed object output")
            .with_category("control-flow")
            .with_output(Port::new("merged", PortType::Object));
        for name in input_names {
            schema = schema.with_input(Port::new(*name, PortType::Any));
        }
        schema
    }
}

#[async_trait]
impl NodeContract for MergeNode {
    async fn execute(&self, inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
        let merged: std::collections::HashMap<String, PortValue> = inputs.into_iter().collect();
        let mut outputs = PortValues::new();
        outputs.insert("merged".to_string(), PortValue::Object(merged));
        ExecutionResult::ok(outputs, 0)
    }
}

/// A node that deliberately fails, tagging the failure retryable or not
/// per configuration. Exists to drive retry and `continueOnError` tests;
/// never register this under a name a real workflow would reference.
pub struct FailingNode {
    pub retryable: bool,
    pub message: String,
}

#[async_trait]
impl NodeContract for FailingNode {
    async fn execute(&self, _inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
        let result = ExecutionResult::failed(self.message.clone(), 0);
        if self.retryable {
            result.retryable()
        } else {
            result
        }
    }
}

/// Reads a boolean-ish JSON value out of a node's declared `config` map,
/// the way a real node implementation typically reads its own settings
/// rather than depending on typed struct fields.
pub fn config_bool(config: &PortValues, key: &str, default: bool) -> bool {
    match config.get(key) {
        Some(PortValue::Boolean(b)) => *b,
        _ => default,
    }
}

pub fn config_json(config: &PortValues, key: &str) -> Option<JsonValue> {
    config.get(key).map(|v| serde_json::to_value(v).unwrap_or(JsonValue::Null))
}
