//! The scheduler that drives a [`WorkflowGraph`] to completion: plans
//! layers, gathers inputs, enforces the concurrency ceiling, timeouts and
//! retries, and reacts to cancellation.

use crate::cancel::CancelSignal;
use crate::error::{Result, WorkflowError};
use crate::event::{EventBus, ExecutionEvent};
use crate::graph::WorkflowGraph;
use crate::node::ExecutionContext;
use crate::planner;
use crate::registry::NodeRegistry;
use crate::retry::RetryPolicy;
use crate::state::{ExecutionStateStore, NodeExecutionState, NodeStatus, RunStatus, WorkflowState};
use crate::value::PortValues;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Tunables for one engine instance. All defaults match the documented
/// platform defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrent_nodes: usize,
    pub default_timeout_seconds: u64,
    pub retry_failed_nodes: bool,
    pub max_retries: usize,
    pub continue_on_error: bool,
    /// Advisory flag surfaced to node implementations; the engine itself
    /// never caches a node's output.
    pub enable_caching: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_concurrent_nodes: 10,
            default_timeout_seconds: 300,
            retry_failed_nodes: true,
            max_retries: 3,
            continue_on_error: false,
            enable_caching: true,
        }
    }
}

/// Drives workflow execution: one instance may run many executions
/// concurrently, each owning its own scheduler loop.
pub struct Engine {
    registry: Arc<NodeRegistry>,
    state_store: Arc<ExecutionStateStore>,
    event_bus: Arc<EventBus>,
    config: EngineConfig,
    cancellations: DashMap<String, CancelSignal>,
}

impl Engine {
    pub fn new(registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
        Engine {
            registry,
            state_store: Arc::new(ExecutionStateStore::new()),
            event_bus: Arc::new(EventBus::default()),
            config,
            cancellations: DashMap::new(),
        }
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn state_store(&self) -> Arc<ExecutionStateStore> {
        self.state_store.clone()
    }

    pub fn get_state(&self, execution_id: &str) -> Option<WorkflowState> {
        self.state_store.get(execution_id)
    }

    pub fn is_running(&self, execution_id: &str) -> bool {
        self.state_store.is_running(execution_id)
    }

    /// Sets the cancellation signal for a registered execution. Returns
    /// whether an execution was registered under that id. Idempotent:
    /// calling this again after the first call changes nothing further.
    pub fn cancel(&self, execution_id: &str) -> bool {
        match self.cancellations.get(execution_id) {
            Some(signal) => {
                signal.cancel();
                true
            }
            None => false,
        }
    }

    /// Runs `graph` to a terminal [`WorkflowState`].
    pub async fn execute(
        &self,
        graph: &WorkflowGraph,
        variables: Option<PortValues>,
        execution_id: Option<String>,
    ) -> Result<WorkflowState> {
        if let Err(e) = graph.validate(&self.registry) {
            self.event_bus.publish(ExecutionEvent::workflow_error(
                &graph.id,
                &execution_id.unwrap_or_default(),
                &e.to_string(),
                Utc::now(),
            ));
            return Err(e);
        }

        let execution_id = execution_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut merged_variables = graph.variables.clone();
        if let Some(caller_vars) = variables {
            merged_variables.extend(caller_vars);
        }

        let plan = planner::plan(graph)?;

        let mut node_states = std::collections::HashMap::new();
        for node in graph.nodes.values() {
            let mut state = NodeExecutionState::pending(node.id.clone());
            if node.disabled {
                state.status = NodeStatus::Skipped;
                state.completed_at = Some(Utc::now());
            }
            node_states.insert(node.id.clone(), state);
        }

        let mut state = WorkflowState {
            workflow_id: graph.id.clone(),
            execution_id: execution_id.clone(),
            status: RunStatus::Running,
            variables: merged_variables,
            node_states,
            total_layers: plan.layers.len(),
            current_layer: 0,
            started_at: Some(Utc::now()),
            completed_at: None,
            error: None,
        };
        self.state_store.save(state.clone());

        let cancel = CancelSignal::new();
        self.cancellations.insert(execution_id.clone(), cancel.clone());

        self.event_bus.publish(ExecutionEvent::workflow_started(&graph.id, &execution_id, Utc::now()));

        let mut failed = false;
        for (layer_index, layer) in plan.layers.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            state.current_layer = layer_index;
            self.event_bus.publish(ExecutionEvent::layer_started(&graph.id, &execution_id, layer_index, layer, Utc::now()));

            let outcomes = self.execute_layer(graph, &execution_id, layer, &mut state, &cancel).await;

            self.state_store.save(state.clone());
            self.event_bus.publish(ExecutionEvent::layer_completed(&graph.id, &execution_id, layer_index, Utc::now()));

            if outcomes.iter().any(|ok| !ok) && !self.config.continue_on_error {
                failed = true;
                break;
            }
        }

        // Cancellation wins over a failure that surfaced only because a
        // node noticed it was cancelled mid-run: a request to cancel
        // always resolves the whole execution to `cancelled`, never
        // `failed`, and every node still `pending` at this point (layers
        // that never got to start) moves to `cancelled` too.
        if cancel.is_cancelled() {
            state.status = RunStatus::Cancelled;
            let now = Utc::now();
            for node_state in state.node_states.values_mut() {
                if node_state.status == NodeStatus::Pending {
                    node_state.status = NodeStatus::Cancelled;
                    node_state.completed_at = Some(now);
                }
            }
        } else if state.status == RunStatus::Running {
            state.status = if failed { RunStatus::Failed } else { RunStatus::Completed };
        }
        state.completed_at = Some(Utc::now());

        match state.status {
            RunStatus::Completed => {
                self.event_bus.publish(ExecutionEvent::workflow_completed(&graph.id, &execution_id, Utc::now()));
            }
            RunStatus::Failed => {
                self.event_bus
                    .publish(ExecutionEvent::workflow_failed(&graph.id, &execution_id, "failed", state.error.as_deref(), Utc::now()));
            }
            RunStatus::Cancelled => {
                self.event_bus
                    .publish(ExecutionEvent::workflow_failed(&graph.id, &execution_id, "cancelled", None, Utc::now()));
            }
            RunStatus::Pending | RunStatus::Running => unreachable!("terminal status expected"),
        }

        self.state_store.save(state.clone());
        self.cancellations.remove(&execution_id);
        Ok(state)
    }

    async fn execute_layer(
        &self,
        graph: &WorkflowGraph,
        execution_id: &str,
        layer: &[String],
        state: &mut WorkflowState,
        cancel: &CancelSignal,
    ) -> Vec<bool> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_nodes.max(1)));
        let mut tasks = Vec::with_capacity(layer.len());

        for node_id in layer {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let node_id = node_id.clone();
            let inputs = self.gather_inputs(graph, state, &node_id);
            let node = graph.nodes.get(&node_id).cloned();
            let registry = self.registry.clone();
            let event_bus = self.event_bus.clone();
            let config = self.config.clone();
            let workflow_id = graph.id.clone();
            let execution_id = execution_id.to_string();
            let variables = state.variables.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                if cancel.is_cancelled() {
                    return (NodeExecutionState { status: NodeStatus::Cancelled, ..NodeExecutionState::pending(node_id.clone()) }, false);
                }
                run_one(
                    &registry,
                    &event_bus,
                    &config,
                    &workflow_id,
                    &execution_id,
                    node,
                    node_id.clone(),
                    inputs,
                    variables,
                    cancel,
                )
                .await
            });
            tasks.push((node_id, handle));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (node_id, task) in tasks {
            let (mut new_state, ok) = match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    let message = if join_err.is_panic() {
                        "node panicked during execution".to_string()
                    } else {
                        "node task was cancelled by the runtime".to_string()
                    };
                    self.event_bus
                        .publish(ExecutionEvent::node_error(&graph.id, execution_id, &node_id, &message, Utc::now()));
                    let mut failed = NodeExecutionState::pending(node_id.clone());
                    failed.status = NodeStatus::Failed;
                    failed.error = Some(message);
                    failed.completed_at = Some(Utc::now());
                    (failed, false)
                }
            };
            new_state.node_id = node_id.clone();
            state.node_states.insert(node_id, new_state);
            outcomes.push(ok);
        }
        outcomes
    }

    fn gather_inputs(&self, graph: &WorkflowGraph, state: &WorkflowState, node_id: &str) -> PortValues {
        let mut inputs = PortValues::new();
        for edge in graph.incoming_edges(node_id) {
            if edge.disabled {
                continue;
            }
            if let Some(source_state) = state.node_states.get(&edge.source_node_id) {
                if source_state.status == NodeStatus::Completed {
                    if let Some(value) = source_state.outputs.get(&edge.source_port) {
                        inputs.insert(edge.target_port.clone(), value.clone());
                    }
                }
            }
        }
        if let Some(node) = graph.nodes.get(node_id) {
            if let Some(schema) = self.registry.schema(&node.node_type) {
                for port in &schema.inputs {
                    if !inputs.contains_key(&port.name) {
                        if let Some(default) = &port.default {
                            inputs.insert(port.name.clone(), default.clone());
                        }
                    }
                }
            }
        }
        inputs
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
    registry: &NodeRegistry,
    event_bus: &EventBus,
    config: &EngineConfig,
    workflow_id: &str,
    execution_id: &str,
    node: Option<crate::graph::WorkflowNode>,
    node_id: String,
    inputs: PortValues,
    variables: PortValues,
    cancel: CancelSignal,
) -> (NodeExecutionState, bool) {
    let Some(node) = node else {
        let mut state = NodeExecutionState::pending(node_id);
        state.status = NodeStatus::Failed;
        state.error = Some("node not found in graph".to_string());
        return (state, false);
    };

    if node.disabled {
        let mut state = NodeExecutionState::pending(node.id);
        state.status = NodeStatus::Skipped;
        state.completed_at = Some(Utc::now());
        return (state, true);
    }

    let (schema, contract) = match registry.require(&node.node_type) {
        Ok(pair) => pair,
        Err(_) => {
            let mut state = NodeExecutionState::pending(node.id.clone());
            state.status = NodeStatus::Failed;
            state.error = Some(WorkflowError::UnknownNodeType(node.node_type.clone()).to_string());
            return (state, false);
        }
    };

    for port in &schema.inputs {
        if port.required && !inputs.contains_key(&port.name) {
            let mut state = NodeExecutionState::pending(node.id.clone());
            state.status = NodeStatus::Failed;
            state.inputs = inputs;
            state.error = Some(format!("missing required input {}", port.name));
            return (state, false);
        }
        if let Some(value) = inputs.get(&port.name) {
            if !value.is_compatible_with(port.port_type) {
                let mut state = NodeExecutionState::pending(node.id.clone());
                state.status = NodeStatus::Failed;
                state.inputs = inputs;
                state.error = Some(format!("input {} has incompatible type", port.name));
                return (state, false);
            }
        }
    }

    event_bus.publish(ExecutionEvent::node_started(workflow_id, execution_id, &node.id, Utc::now()));

    let timeout_seconds = node
        .config
        .get("timeout_seconds")
        .and_then(|v| match v {
            crate::value::PortValue::Integer(n) => Some(*n as u64),
            _ => None,
        })
        .unwrap_or(config.default_timeout_seconds);

    let retry_policy = RetryPolicy::default().with_initial_interval(0.1).with_max_interval(5.0);
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let started_at = Utc::now();
        let started = Instant::now();

        let ctx = ExecutionContext {
            workflow_id: workflow_id.to_string(),
            execution_id: execution_id.to_string(),
            node_id: node.id.clone(),
            variables: variables.clone(),
            config: node.config.clone(),
            cancel: cancel.clone(),
        };

        let execution = contract.execute(inputs.clone(), ctx);
        tokio::pin!(execution);
        let timeout_sleep = tokio::time::sleep(Duration::from_secs(timeout_seconds.max(1)));
        tokio::pin!(timeout_sleep);

        enum RaceOutcome {
            TimedOut,
            CancelledMidRun,
            Finished(crate::node::ExecutionResult),
        }

        let race = tokio::select! {
            result = &mut execution => RaceOutcome::Finished(result),
            _ = &mut timeout_sleep => RaceOutcome::TimedOut,
            _ = cancel.cancelled() => RaceOutcome::CancelledMidRun,
        };

        let outcome = match race {
            RaceOutcome::TimedOut => Err(()),
            RaceOutcome::Finished(result) => Ok(result),
            RaceOutcome::CancelledMidRun => {
                let grace_seconds = config.default_timeout_seconds.min(30).max(1);
                let grace = tokio::time::sleep(Duration::from_secs(grace_seconds));
                tokio::pin!(grace);

                tokio::select! {
                    _result = &mut execution => {}
                    _ = &mut grace => {}
                }

                event_bus.publish(ExecutionEvent::node_error(
                    workflow_id,
                    execution_id,
                    &node.id,
                    "cancelled while running",
                    Utc::now(),
                ));
                let mut state = NodeExecutionState::pending(node.id.clone());
                state.status = NodeStatus::Cancelled;
                state.inputs = inputs;
                state.attempts = attempts;
                state.started_at = Some(started_at);
                state.completed_at = Some(Utc::now());
                state.error = Some("cancelled while running".to_string());
                return (state, false);
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(()) => {
                event_bus.publish(ExecutionEvent::node_timeout(workflow_id, execution_id, &node.id, timeout_seconds, Utc::now()));
                let mut state = NodeExecutionState::pending(node.id.clone());
                state.status = NodeStatus::Failed;
                state.inputs = inputs;
                state.attempts = attempts;
                state.started_at = Some(started_at);
                state.completed_at = Some(Utc::now());
                state.error = Some(format!("timeout after {timeout_seconds} seconds"));
                return (state, false);
            }
            Ok(result) if result.success => {
                event_bus.publish(ExecutionEvent::node_completed(
                    workflow_id,
                    execution_id,
                    &node.id,
                    &result.outputs,
                    duration_ms,
                    Utc::now(),
                ));
                let mut state = NodeExecutionState::pending(node.id.clone());
                state.status = NodeStatus::Completed;
                state.inputs = inputs;
                state.outputs = result.outputs;
                state.attempts = attempts;
                state.started_at = Some(started_at);
                state.completed_at = Some(Utc::now());
                return (state, true);
            }
            Ok(result) => {
                let message = result.error.clone().unwrap_or_else(|| "node reported failure".to_string());
                event_bus.publish(ExecutionEvent::node_error(workflow_id, execution_id, &node.id, &message, Utc::now()));

                let retryable = result.is_retryable();
                if config.retry_failed_nodes && retryable && attempts < config.max_retries {
                    let delay = retry_policy.calculate_delay(attempts - 1);
                    event_bus.publish(ExecutionEvent::node_error(
                        workflow_id,
                        execution_id,
                        &node.id,
                        &format!("retrying after {}ms", delay.as_millis()),
                        Utc::now(),
                    ));
                    tokio::time::sleep(delay).await;
                    continue;
                }

                let mut state = NodeExecutionState::pending(node.id.clone());
                state.status = NodeStatus::Failed;
                state.inputs = inputs;
                state.attempts = attempts;
                state.started_at = Some(started_at);
                state.completed_at = Some(Utc::now());
                state.error = Some(message);
                state.error_traceback = result.error_traceback;
                return (state, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{WorkflowEdge, WorkflowNode};
    use crate::node::{ExecutionResult, NodeContract};
    use crate::schema::{NodeSchema, Port};
    use crate::value::{PortType, PortValue};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DataSource {
        value: i64,
    }

    #[async_trait]
    impl NodeContract for DataSource {
        async fn execute(&self, _inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
            let mut outputs = PortValues::new();
            outputs.insert("out".to_string(), PortValue::Integer(self.value));
            ExecutionResult::ok(outputs, 0)
        }
    }

    struct Identity;

    #[async_trait]
    impl NodeContract for Identity {
        async fn execute(&self, inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
            let value = inputs.get("in").cloned().unwrap_or(PortValue::Integer(0));
            let mut outputs = PortValues::new();
            outputs.insert("out".to_string(), value);
            ExecutionResult::ok(outputs, 0)
        }
    }

    struct Sleeper {
        millis: u64,
    }

    #[async_trait]
    impl NodeContract for Sleeper {
        async fn execute(&self, _inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
            tokio::time::sleep(Duration::from_millis(self.millis)).await;
            ExecutionResult::ok(PortValues::new(), self.millis)
        }
    }

    struct AlwaysFails {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NodeContract for AlwaysFails {
        async fn execute(&self, _inputs: PortValues, _ctx: ExecutionContext) -> ExecutionResult {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            ExecutionResult::failed("transient failure", 0).retryable()
        }
    }

    fn registry() -> Arc<NodeRegistry> {
        let registry = NodeRegistry::new();
        registry.register(
            NodeSchema::new("data_source").with_output(Port::new("out", PortType::Integer)),
            Arc::new(DataSource { value: 7 }),
        );
        registry.register(
            NodeSchema::new("identity")
                .with_input(Port::new("in", PortType::Any).required())
                .with_output(Port::new("out", PortType::Any)),
            Arc::new(Identity),
        );
        Arc::new(registry)
    }

    fn graph_with(registry: &NodeRegistry) -> WorkflowGraph {
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "data_source"), now).unwrap();
        graph.add_node(WorkflowNode::new("b", "identity"), now).unwrap();
        graph
            .add_edge(WorkflowEdge::new("e1", "a", "out", "b", "in"), registry, now)
            .unwrap();
        graph
    }

    #[tokio::test]
    async fn linear_pipeline_completes_and_propagates_outputs() {
        let registry = registry();
        let graph = graph_with(&registry);
        let engine = Engine::new(registry, EngineConfig::default());
        let state = engine.execute(&graph, None, None).await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.node_states["b"].outputs["out"], PortValue::Integer(7));
    }

    #[tokio::test]
    async fn cyclic_graph_fails_fast_with_invalid_workflow() {
        let registry = NodeRegistry::new();
        registry.register(
            NodeSchema::new("identity")
                .with_input(Port::new("in", PortType::Any))
                .with_output(Port::new("out", PortType::Any)),
            Arc::new(Identity),
        );
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "identity"), now).unwrap();
        graph.add_node(WorkflowNode::new("b", "identity"), now).unwrap();
        graph.edges.insert("e1".into(), WorkflowEdge::new("e1", "a", "out", "b", "in"));
        graph.edges.insert("e2".into(), WorkflowEdge::new("e2", "b", "out", "a", "in"));

        let engine = Engine::new(registry, EngineConfig::default());
        let err = engine.execute(&graph, None, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWorkflow(_)));
    }

    #[tokio::test]
    async fn fan_out_respects_concurrency_ceiling() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("source").with_output(Port::new("out", PortType::Any)), Arc::new(DataSource { value: 1 }));
        registry.register(
            NodeSchema::new("sleep").with_input(Port::new("in", PortType::Any)).with_output(Port::new("out", PortType::Any)),
            Arc::new(Sleeper { millis: 100 }),
        );
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "source"), now).unwrap();
        for id in ["b", "c", "d"] {
            graph.add_node(WorkflowNode::new(id, "sleep"), now).unwrap();
            graph
                .add_edge(WorkflowEdge::new(format!("e-{id}"), "a", "out", id, "in"), &registry, now)
                .unwrap();
        }

        let mut config = EngineConfig::default();
        config.max_concurrent_nodes = 2;
        let engine = Engine::new(registry, config);

        let started = Instant::now();
        let state = engine.execute(&graph, None, None).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(state.status, RunStatus::Completed);
        assert!(elapsed >= Duration::from_millis(150), "expected at least two sequential sleeps, took {elapsed:?}");
    }

    #[tokio::test]
    async fn retryable_failure_is_retried_until_max_retries() {
        let registry = NodeRegistry::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        registry.register(NodeSchema::new("flaky"), Arc::new(AlwaysFails { attempts: attempts.clone() }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "flaky"), now).unwrap();

        let mut config = EngineConfig::default();
        config.max_retries = 3;
        let engine = Engine::new(registry, config);
        let state = engine.execute(&graph, None, None).await.unwrap();

        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn disabled_node_is_skipped_without_running() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("source").with_output(Port::new("out", PortType::Any)), Arc::new(DataSource { value: 1 }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        let mut node = WorkflowNode::new("a", "source");
        node.disabled = true;
        graph.add_node(node, now).unwrap();

        let engine = Engine::new(registry, EngineConfig::default());
        let state = engine.execute(&graph, None, None).await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.node_states["a"].status, NodeStatus::Skipped);
    }

    #[tokio::test]
    async fn cancel_before_next_layer_stops_new_nodes_and_is_idempotent() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("source").with_output(Port::new("out", PortType::Any)), Arc::new(DataSource { value: 1 }));
        registry.register(
            NodeSchema::new("sleep").with_input(Port::new("in", PortType::Any)).with_output(Port::new("out", PortType::Any)),
            Arc::new(Sleeper { millis: 500 }),
        );
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "source"), now).unwrap();
        graph.add_node(WorkflowNode::new("b", "sleep"), now).unwrap();
        graph
            .add_edge(WorkflowEdge::new("e1", "a", "out", "b", "in"), &registry, now)
            .unwrap();

        let engine = Arc::new(Engine::new(registry, EngineConfig::default()));
        let execution_id = "fixed-id".to_string();
        let engine_clone = engine.clone();
        let graph_clone = graph.clone();
        let exec_id_clone = execution_id.clone();
        let handle = tokio::spawn(async move {
            engine_clone.execute(&graph_clone, None, Some(exec_id_clone)).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.cancel(&execution_id));
        assert!(engine.cancel(&execution_id));

        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Cancelled);
        assert_eq!(state.node_states["b"].status, NodeStatus::Cancelled);
    }

    #[tokio::test]
    async fn slow_node_is_marked_failed_on_timeout() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("sleep").with_output(Port::new("out", PortType::Any)), Arc::new(Sleeper { millis: 10_000 }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "sleep"), now).unwrap();

        let mut config = EngineConfig::default();
        config.default_timeout_seconds = 1;
        let engine = Engine::new(registry, config);

        let started = Instant::now();
        let state = engine.execute(&graph, None, None).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.node_states["a"].status, NodeStatus::Failed);
        assert!(elapsed < Duration::from_secs(5), "timeout should cut the 10s sleep short, took {elapsed:?}");
    }

    #[tokio::test]
    async fn per_node_config_timeout_overrides_the_engine_default() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("sleep").with_output(Port::new("out", PortType::Any)), Arc::new(Sleeper { millis: 500 }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        let mut node = WorkflowNode::new("a", "sleep");
        node.config.insert("timeout_seconds".to_string(), PortValue::Integer(0));
        graph.add_node(node, now).unwrap();

        // Engine default is generous; only the node's own override is short.
        let mut config = EngineConfig::default();
        config.default_timeout_seconds = 300;
        let engine = Engine::new(registry, config);

        let state = engine.execute(&graph, None, None).await.unwrap();
        assert_eq!(state.node_states["a"].status, NodeStatus::Failed);
    }

    struct CancelAwareSleeper {
        millis: u64,
    }

    #[async_trait]
    impl NodeContract for CancelAwareSleeper {
        async fn execute(&self, _inputs: PortValues, ctx: ExecutionContext) -> ExecutionResult {
            let tick = Duration::from_millis(5);
            let mut remaining = Duration::from_millis(self.millis);
            while remaining > Duration::ZERO {
                if ctx.is_cancelled() {
                    return ExecutionResult::failed("cancelled mid-delay", 0);
                }
                let step = tick.min(remaining);
                tokio::time::sleep(step).await;
                remaining = remaining.saturating_sub(step);
            }
            ExecutionResult::ok(PortValues::new(), self.millis)
        }
    }

    #[tokio::test]
    async fn node_noticing_its_own_cancellation_is_marked_cancelled_not_failed() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("sleep").with_output(Port::new("out", PortType::Any)), Arc::new(CancelAwareSleeper { millis: 500 }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "sleep"), now).unwrap();

        let engine = Arc::new(Engine::new(registry, EngineConfig::default()));
        let execution_id = "cancel-mid-run".to_string();
        let engine_clone = engine.clone();
        let graph_clone = graph.clone();
        let exec_id_clone = execution_id.clone();
        let handle = tokio::spawn(async move { engine_clone.execute(&graph_clone, None, Some(exec_id_clone)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.cancel(&execution_id));

        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Cancelled);
        assert_eq!(state.node_states["a"].status, NodeStatus::Cancelled);
    }

    #[tokio::test]
    async fn node_with_no_internal_cancellation_check_is_still_cancelled_after_grace() {
        let registry = NodeRegistry::new();
        registry.register(NodeSchema::new("sleep").with_output(Port::new("out", PortType::Any)), Arc::new(Sleeper { millis: 10_000 }));
        let registry = Arc::new(registry);
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "test", now);
        graph.add_node(WorkflowNode::new("a", "sleep"), now).unwrap();

        let mut config = EngineConfig::default();
        config.default_timeout_seconds = 1;
        let engine = Arc::new(Engine::new(registry, config));
        let execution_id = "cancel-force".to_string();
        let engine_clone = engine.clone();
        let graph_clone = graph.clone();
        let exec_id_clone = execution_id.clone();
        let handle = tokio::spawn(async move { engine_clone.execute(&graph_clone, None, Some(exec_id_clone)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.cancel(&execution_id));

        let started = Instant::now();
        let state = handle.await.unwrap().unwrap();
        let elapsed = started.elapsed();

        assert_eq!(state.status, RunStatus::Cancelled);
        assert_eq!(state.node_states["a"].status, NodeStatus::Cancelled);
        assert!(elapsed < Duration::from_secs(5), "grace (1s) should cut the 10s sleep short, took {elapsed:?}");
    }
}
