// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node type registry.
//!
//! A process-wide mapping from type name to constructor, populated by
//! compile-time registration calls (no reflection, no runtime class
//! loading). The registry doubles as the [`PortCatalog`] used for
//! workflow validation.

use crate::node::NodeInstance;
use armada_core::NodeId;
use armada_model::{NodePorts, NodeSpec, PortCatalog};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Constructor for a node implementation.
pub type NodeFactory = fn(&NodeId, &Map<String, Value>) -> Box<dyn NodeInstance>;

#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Empty registry (tests register what they need).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in control-flow nodes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, node_type: impl Into<String>, factory: NodeFactory) {
        self.factories.insert(node_type.into(), factory);
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Construct an instance for a node spec. `None` for unknown types.
    pub fn instantiate(&self, spec: &NodeSpec) -> Option<Box<dyn NodeInstance>> {
        self.factories.get(&spec.node_type).map(|f| f(&spec.id, &spec.config))
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl PortCatalog for NodeRegistry {
    fn ports(&self, node: &NodeSpec) -> Option<NodePorts> {
        self.instantiate(node).map(|instance| instance.ports())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
