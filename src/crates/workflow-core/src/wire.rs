//! Wire (de)serialization for [`WorkflowGraph`] and [`ExecutionEvent`].
//!
//! JSON is the primary format; YAML is accepted for hand-authored graphs.
//! Every struct on the wire carries a flattened `extra` map so fields this
//! build doesn't know about survive a decode/re-encode round trip instead
//! of being silently dropped.

use crate::error::{Result, WorkflowError};
use crate::graph::WorkflowGraph;

pub fn graph_from_json(bytes: &str) -> Result<WorkflowGraph> {
    Ok(serde_json::from_str(bytes)?)
}

pub fn graph_to_json(graph: &WorkflowGraph) -> Result<String> {
    serde_json::to_string_pretty(graph).map_err(WorkflowError::from)
}

pub fn graph_from_yaml(text: &str) -> Result<WorkflowGraph> {
    serde_yaml::from_str(text).map_err(|e| WorkflowError::invalid_workflow(format!("malformed yaml graph: {e}")))
}

pub fn graph_to_yaml(graph: &WorkflowGraph) -> Result<String> {
    serde_yaml::to_string(graph).map_err(|e| WorkflowError::invalid_workflow(format!("cannot encode graph as yaml: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unknown_fields_survive_a_json_round_trip() {
        let json = r#"{
            "id": "g1",
            "metadata": {"name": "demo", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
            "nodes": {},
            "edges": {},
            "futureField": "kept"
        }"#;
        let graph = graph_from_json(json).unwrap();
        assert_eq!(graph.extra.get("futureField").and_then(|v| v.as_str()), Some("kept"));
        let back = graph_to_json(&graph).unwrap();
        assert!(back.contains("futureField"));
    }

    #[test]
    fn json_round_trip_preserves_node_and_edge_content() {
        let now = Utc::now();
        let mut graph = WorkflowGraph::new("g1", "demo", now);
        graph
            .add_node(crate::graph::WorkflowNode::new("a", "noop"), now)
            .unwrap();
        let json = graph_to_json(&graph).unwrap();
        let decoded = graph_from_json(&json).unwrap();
        assert_eq!(decoded.nodes.len(), 1);
        assert!(decoded.nodes.contains_key("a"));
    }

    #[test]
    fn yaml_round_trip_works() {
        let now = Utc::now();
        let graph = WorkflowGraph::new("g1", "demo", now);
        let yaml = graph_to_yaml(&graph).unwrap();
        let decoded = graph_from_yaml(&yaml).unwrap();
        assert_eq!(decoded.id, "g1");
    }
}
