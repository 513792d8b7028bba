//! DTOs for the `/workflows/*` routes.

use serde::{Deserialize, Serialize};
use workflow_core::{NodeSchema, PortValues, WorkflowGraph};

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub graph: WorkflowGraph,
    #[serde(default)]
    pub variables: Option<PortValues>,
    #[serde(default)]
    pub execution_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// One port in a [`NodeTypeDto`] listing.
#[derive(Debug, Clone, Serialize)]
pub struct NodeTypePortDto {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: String,
    pub required: bool,
}

/// A single registered node type, for the `/node-types` introspection route.
#[derive(Debug, Clone, Serialize)]
pub struct NodeTypeDto {
    #[serde(rename = "type")]
    pub node_type: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub inputs: Vec<NodeTypePortDto>,
    pub outputs: Vec<NodeTypePortDto>,
}

impl From<NodeSchema> for NodeTypeDto {
    fn from(schema: NodeSchema) -> Self {
        let to_dto = |p: workflow_core::Port| NodeTypePortDto {
            name: p.name,
            port_type: format!("{:?}", p.port_type).to_lowercase(),
            required: p.required,
        };
        NodeTypeDto {
            node_type: schema.node_type,
            display_name: schema.display_name,
            description: schema.description,
            category: schema.category,
            inputs: schema.inputs.into_iter().map(to_dto).collect(),
            outputs: schema.outputs.into_iter().map(to_dto).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn execute_request_deserializes_a_bare_graph() {
        let graph = WorkflowGraph::new("g1", "demo", Utc::now());
        let body = serde_json::json!({ "graph": graph });
        let req: ExecuteRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.graph.id, "g1");
        assert!(req.variables.is_none());
        assert!(req.execution_id.is_none());
    }

    #[test]
    fn node_type_dto_lowercases_its_port_types() {
        use workflow_core::value::PortType;
        use workflow_core::Port;

        let schema = NodeSchema::new("identity")
            .with_display_name("Identity")
            .with_description("Passes its input straight through to its output")
            .with_category("control-flow")
            .with_input(Port::new("in", PortType::Any).required())
            .with_output(Port::new("out", PortType::String));
        let dto: NodeTypeDto = schema.into();
        assert_eq!(dto.node_type, "identity");
        assert_eq!(dto.display_name, "Identity");
        assert_eq!(dto.category, "control-flow");
        assert_eq!(dto.inputs[0].port_type, "any");
        assert!(dto.inputs[0].required);
        assert_eq!(dto.outputs[0].port_type, "string");
    }
}
