//! Topological planning: arranging a [`WorkflowGraph`] into layers that can
//! each run with internal parallelism.
//!
//! This is Kahn's algorithm run to completion up front rather than
//! incrementally per superstep: every non-disabled node's in-degree over
//! non-disabled edges is computed once, nodes with in-degree zero form a
//! layer, and removing that layer's out-edges exposes the next layer. A
//! workflow with a cycle never produces a full plan; [`WorkflowGraph::validate`]
//! is expected to have already rejected cycles, but the planner re-checks
//! defensively. Disabled nodes are excluded entirely: the engine treats
//! them as immediately `skipped` rather than scheduling them into a layer.

use crate::error::{Result, WorkflowError};
use crate::graph::{NodeId, WorkflowGraph};
use std::collections::HashMap;

/// An execution plan: nodes grouped into layers, where every node in layer
/// `N` depends only on nodes in layers `0..N` and nodes within the same
/// layer may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub layers: Vec<Vec<NodeId>>,
}

impl ExecutionPlan {
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(|l| l.len()).sum()
    }
}

/// Build a layered execution plan over every non-disabled node. The graph
/// is assumed to already be structurally valid; call
/// [`WorkflowGraph::validate`] first.
pub fn plan(graph: &WorkflowGraph) -> Result<ExecutionPlan> {
    let active_nodes: Vec<&str> =
        graph.nodes.values().filter(|n| !n.disabled).map(|n| n.id.as_str()).collect();
    let active_edges: Vec<&crate::graph::WorkflowEdge> = graph
        .edges
        .values()
        .filter(|e| {
            !e.disabled
                && graph.nodes.get(&e.source_node_id).map(|n| !n.disabled).unwrap_or(false)
                && graph.nodes.get(&e.target_node_id).map(|n| !n.disabled).unwrap_or(false)
        })
        .collect();

    let mut remaining: HashMap<&str, usize> = active_nodes.iter().map(|id| (*id, 0usize)).collect();
    for edge in &active_edges {
        *remaining.entry(edge.target_node_id.as_str()).or_insert(0) += 1;
    }

    let mut layers = Vec::new();
    let mut scheduled = 0usize;

    loop {
        let mut layer: Vec<NodeId> =
            remaining.iter().filter(|(_, &deg)| deg == 0).map(|(id, _)| id.to_string()).collect();
        if layer.is_empty() {
            break;
        }
        layer.sort();
        for id in &layer {
            remaining.remove(id.as_str());
        }
        for id in &layer {
            for edge in active_edges.iter().filter(|e| &e.source_node_id == id) {
                if let Some(deg) = remaining.get_mut(edge.target_node_id.as_str()) {
                    *deg = deg.saturating_sub(1);
                }
            }
        }
        scheduled += layer.len();
        layers.push(layer);
    }

    if scheduled != active_nodes.len() {
        return Err(WorkflowError::invalid_workflow(
            "graph contains a cycle; cannot produce a layered plan",
        ));
    }

    Ok(ExecutionPlan { layers })
}
