// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node declaration inside a workflow blob.

use armada_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node as declared in a workflow: an id, a type name selecting an
/// implementation from the registry, and a free-form config map whose keys
/// are interpreted against the type's declared ports and properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self { id: id.into(), node_type: node_type.into(), config: Map::new() }
    }

    /// Set a config key (builder-style, used heavily in tests).
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Read a string-typed config key.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}
