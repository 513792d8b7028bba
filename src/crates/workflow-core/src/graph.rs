//! The workflow graph model: nodes, edges, and structural validation.

use crate::error::{Result, WorkflowError};
use crate::registry::NodeRegistry;
use crate::value::{PortType, PortValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet, VecDeque};

pub type NodeId = String;
pub type EdgeId = String;

/// One instance of a node type within a workflow.
///
/// `extra` carries any wire fields this version doesn't model, so a graph
/// round-tripped through [`crate::wire`] keeps fields a newer producer
/// wrote even though this binary never reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    pub node_type: String,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default)]
    pub config: PortValues,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten, default)]
    pub extra: Map<String, JsonValue>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        WorkflowNode {
            id: id.into(),
            node_type: node_type.into(),
            position_x: 0.0,
            position_y: 0.0,
            config: PortValues::new(),
            label: None,
            disabled: false,
            extra: Map::new(),
        }
    }
}

/// A directed connection from one node's output port to another node's
/// input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_port: String,
    pub target_node_id: NodeId,
    pub target_port: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten, default)]
    pub extra: Map<String, JsonValue>,
}

impl WorkflowEdge {
    pub fn new(
        id: impl Into<String>,
        source_node_id: impl Into<String>,
        source_port: impl Into<String>,
        target_node_id: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        WorkflowEdge {
            id: id.into(),
            source_node_id: source_node_id.into(),
            source_port: source_port.into(),
            target_node_id: target_node_id.into(),
            target_port: target_port.into(),
            disabled: false,
            extra: Map::new(),
        }
    }
}

/// Descriptive metadata carried alongside a graph, bumped on mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GraphMetadata {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        GraphMetadata { name: name.into(), description: String::new(), created_at: now, updated_at: now }
    }
}

/// A workflow: a set of node instances and the edges wiring their ports
/// together, plus graph-scoped variables available to every node's
/// execution context.
///
/// `WorkflowGraph` is the in-memory arena the planner and engine operate
/// on; it owns no per-execution state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub id: String,
    pub metadata: GraphMetadata,
    pub nodes: HashMap<NodeId, WorkflowNode>,
    pub edges: HashMap<EdgeId, WorkflowEdge>,
    #[serde(default)]
    pub variables: PortValues,
    #[serde(flatten, default)]
    pub extra: Map<String, JsonValue>,
}

impl WorkflowGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        WorkflowGraph {
            id: id.into(),
            metadata: GraphMetadata::new(name, now),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            variables: PortValues::new(),
            extra: Map::new(),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.metadata.updated_at = now;
    }

    /// Fails if a node with the same id is already present.
    pub fn add_node(&mut self, node: WorkflowNode, now: DateTime<Utc>) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(WorkflowError::invalid_workflow(format!("duplicate node id {}", node.id)));
        }
        self.nodes.insert(node.id.clone(), node);
        self.touch(now);
        Ok(())
    }

    /// Removes the node and every edge incident to it. No-op if absent.
    pub fn remove_node(&mut self, node_id: &str, now: DateTime<Utc>) {
        if self.nodes.remove(node_id).is_none() {
            return;
        }
        self.edges.retain(|_, e| e.source_node_id != node_id && e.target_node_id != node_id);
        self.touch(now);
    }

    /// Validates endpoints, ports, type compatibility, single-binding of
    /// the target port, and acyclicity before inserting.
    pub fn add_edge(&mut self, edge: WorkflowEdge, registry: &NodeRegistry, now: DateTime<Utc>) -> Result<()> {
        self.check_edge(&edge, registry)?;
        let mut probe = self.clone();
        probe.edges.insert(edge.id.clone(), edge.clone());
        probe.detect_cycle()?;
        self.edges.insert(edge.id.clone(), edge);
        self.touch(now);
        Ok(())
    }

    /// Idempotent: removing an absent edge id is not an error.
    pub fn remove_edge(&mut self, edge_id: &str, now: DateTime<Utc>) {
        if self.edges.remove(edge_id).is_some() {
            self.touch(now);
        }
    }

    pub fn incoming_edges(&self, node_id: &str) -> Vec<&WorkflowEdge> {
        self.edges.values().filter(|e| e.target_node_id == node_id).collect()
    }

    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&WorkflowEdge> {
        self.edges.values().filter(|e| e.source_node_id == node_id).collect()
    }

    fn check_edge(&self, edge: &WorkflowEdge, registry: &NodeRegistry) -> Result<()> {
        let source = self.nodes.get(&edge.source_node_id).ok_or_else(|| {
            WorkflowError::invalid_workflow(format!("edge references unknown source node {}", edge.source_node_id))
        })?;
        let target = self.nodes.get(&edge.target_node_id).ok_or_else(|| {
            WorkflowError::invalid_workflow(format!("edge references unknown target node {}", edge.target_node_id))
        })?;
        let source_schema = registry
            .schema(&source.node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(source.node_type.clone()))?;
        let target_schema = registry
            .schema(&target.node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(target.node_type.clone()))?;
        let out_port = source_schema.output(&edge.source_port).ok_or_else(|| {
            WorkflowError::invalid_workflow(format!("node {} has no output port {}", source.id, edge.source_port))
        })?;
        let in_port = target_schema.input(&edge.target_port).ok_or_else(|| {
            WorkflowError::invalid_workflow(format!("node {} has no input port {}", target.id, edge.target_port))
        })?;
        if out_port.port_type != in_port.port_type
            && out_port.port_type != PortType::Any
            && in_port.port_type != PortType::Any
        {
            return Err(WorkflowError::invalid_workflow(format!(
                "port type mismatch: {}.{} ({:?}) -> {}.{} ({:?})",
                source.id, edge.source_port, out_port.port_type, target.id, edge.target_port, in_port.port_type
            )));
        }
        let already_bound = self
            .edges
            .values()
            .any(|e| e.target_node_id == edge.target_node_id && e.target_port == edge.target_port);
        if already_bound {
            return Err(WorkflowError::invalid_workflow(format!(
                "input port {}.{} is already bound",
                target.id, edge.target_port
            )));
        }
        Ok(())
    }

    /// Every invariant violation currently present in the graph: cycles,
    /// dangling references, type mismatches, duplicate target bindings,
    /// unknown node types, and missing required inputs.
    pub fn validation_errors(&self, registry: &NodeRegistry) -> Vec<String> {
        let mut errors = Vec::new();

        for node in self.nodes.values() {
            if !registry.contains(&node.node_type) {
                errors.push(format!("node {} has unknown node type {}", node.id, node.node_type));
            }
        }

        let mut input_edge_count: HashMap<(&str, &str), usize> = HashMap::new();
        for edge in self.edges.values() {
            if let Err(e) = self.check_single_edge_refs(edge, registry) {
                errors.push(e);
                continue;
            }
            let key = (edge.target_node_id.as_str(), edge.target_port.as_str());
            *input_edge_count.entry(key).or_insert(0) += 1;
        }
        for ((node_id, port), count) in input_edge_count {
            if count > 1 {
                errors.push(format!("input port {node_id}.{port} is bound by more than one edge"));
            }
        }

        for node in self.nodes.values() {
            if node.disabled {
                continue;
            }
            let Some(schema) = registry.schema(&node.node_type) else { continue };
            for port in &schema.inputs {
                if !port.required {
                    continue;
                }
                let wired = self
                    .incoming_edges(&node.id)
                    .iter()
                    .any(|e| !e.disabled && e.target_port == port.name);
                if !wired && port.default.is_none() {
                    errors.push(format!("node {} is missing required input {}", node.id, port.name));
                }
            }
        }

        if self.detect_cycle().is_err() {
            errors.push("graph contains a cycle".to_string());
        }

        errors
    }

    fn check_single_edge_refs(&self, edge: &WorkflowEdge, registry: &NodeRegistry) -> std::result::Result<(), String> {
        let source = self
            .nodes
            .get(&edge.source_node_id)
            .ok_or_else(|| format!("edge {} references unknown source node {}", edge.id, edge.source_node_id))?;
        let target = self
            .nodes
            .get(&edge.target_node_id)
            .ok_or_else(|| format!("edge {} references unknown target node {}", edge.id, edge.target_node_id))?;
        let Some(source_schema) = registry.schema(&source.node_type) else { return Ok(()) };
        let Some(target_schema) = registry.schema(&target.node_type) else { return Ok(()) };
        if source_schema.output(&edge.source_port).is_none() {
            return Err(format!("node {} has no output port {}", source.id, edge.source_port));
        }
        if target_schema.input(&edge.target_port).is_none() {
            return Err(format!("node {} has no input port {}", target.id, edge.target_port));
        }
        Ok(())
    }

    /// Fails with `InvalidWorkflow` listing every violation, or succeeds.
    pub fn validate(&self, registry: &NodeRegistry) -> Result<()> {
        let errors = self.validation_errors(registry);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::invalid_workflow(errors.join("; ")))
        }
    }

    fn detect_cycle(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: HashMap<&str, Mark> =
            self.nodes.keys().map(|id| (id.as_str(), Mark::Unvisited)).collect();

        fn visit<'a>(graph: &'a WorkflowGraph, node_id: &'a str, marks: &mut HashMap<&'a str, Mark>) -> Result<()> {
            match marks.get(node_id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    return Err(WorkflowError::invalid_workflow(format!("cycle detected through node {node_id}")))
                }
                _ => {}
            }
            marks.insert(node_id, Mark::InProgress);
            for edge in graph.edges.values().filter(|e| e.source_node_id == node_id) {
                visit(graph, edge.target_node_id.as_str(), marks)?;
            }
            marks.insert(node_id, Mark::Done);
            Ok(())
        }

        let ids: Vec<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        for id in ids {
            if marks.get(id) == Some(&Mark::Unvisited) {
                visit(self, id, &mut marks)?;
            }
        }
        Ok(())
    }

    /// Breadth-first reachability from a node, used by cancellation
    /// bookkeeping and partial-graph tooling.
    pub fn downstream_of(&self, node_id: &str) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([node_id.to_string()]);
        while let Some(current) = queue.pop_front() {
            for edge in self.edges.values().filter(|e| e.source_node_id == current) {
                if seen.insert(edge.target_node_id.clone()) {
                    queue.push_back(edge.target_node_id.clone());
                }
            }
        }
        seen
    }
}
