//! Node schemas: the typed contract a node type publishes to the registry.

use crate::value::{PortType, PortValue};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single named, typed input or output slot on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
    #[serde(default)]
    pub required: bool,
    /// Value substituted when a `required` input has no incoming edge.
    #[serde(default)]
    pub default: Option<PortValue>,
}

impl Port {
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Port { name: name.into(), port_type, required: false, default: None }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: PortValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// The published contract for one node type: its identifying name plus the
/// input and output ports every instance of that type exposes.
///
/// Schemas are registered once per node type, not once per node instance;
/// a workflow may contain many nodes of the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub node_type: String,
    /// Human-facing label for UIs; falls back to `node_type` when unset.
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form grouping used by catalog/browsing UIs (e.g. "data", "control-flow").
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Opaque JSON Schema describing the node's `config` map; `None` means
    /// the node places no declared constraints on its config.
    #[serde(default)]
    pub config_schema: Option<JsonValue>,
}

impl NodeSchema {
    pub fn new(node_type: impl Into<String>) -> Self {
        let node_type = node_type.into();
        NodeSchema {
            display_name: node_type.clone(),
            node_type,
            description: String::new(),
            category: String::new(),
            version: "1.0.0".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_schema: None,
        }
    }

    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_config_schema(mut self, schema: JsonValue) -> Self {
        self.config_schema = Some(schema);
        self
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }
}
