//! Process-wide registry of node types.
//!
//! Mirrors the shape of a tool registry: a name-keyed map guarded by a
//! mutex for writes, with reads handed out as cheap `Arc` clones so
//! concurrent node executions never contend on the registration lock.

use crate::error::{Result, WorkflowError};
use crate::node::NodeContract;
use crate::schema::NodeSchema;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct Registration {
    schema: NodeSchema,
    contract: Arc<dyn NodeContract>,
}

/// Registers node types by name and resolves them for the planner and
/// engine at workflow-build time.
#[derive(Default)]
pub struct NodeRegistry {
    entries: RwLock<HashMap<String, Registration>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry { entries: RwLock::new(HashMap::new()) }
    }

    /// Register a node type, replacing any prior registration under the
    /// same name.
    pub fn register(&self, schema: NodeSchema, contract: Arc<dyn NodeContract>) {
        let node_type = schema.node_type.clone();
        self.entries.write().insert(node_type, Registration { schema, contract });
    }

    pub fn schema(&self, node_type: &str) -> Option<NodeSchema> {
        self.entries.read().get(node_type).map(|r| r.schema.clone())
    }

    pub fn contract(&self, node_type: &str) -> Option<Arc<dyn NodeContract>> {
        self.entries.read().get(node_type).map(|r| r.contract.clone())
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entries.read().contains_key(node_type)
    }

    pub fn node_types(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Every registered schema, for introspection endpoints; unordered.
    pub fn all_schemas(&self) -> Vec<NodeSchema> {
        self.entries.read().values().map(|r| r.schema.clone()).collect()
    }

    /// Resolve a node type, or the registry's `UnknownNodeType` error.
    pub fn require(&self, node_type: &str) -> Result<(NodeSchema, Arc<dyn NodeContract>)> {
        let guard = self.entries.read();
        guard
            .get(node_type)
            .map(|r| (r.schema.clone(), r.contract.clone()))
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_string()))
    }
}
