// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow aggregate.

use crate::connection::Connection;
use crate::node::NodeSpec;
use crate::port::DataType;
use armada_core::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive metadata on a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A workflow-level parameter: a named value referenced by nodes through
/// the variable resolver, overridable per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Declared workflow (or subflow) input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDef {
    pub name: String,
    #[serde(default = "any_type")]
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Declared workflow (or subflow) output: collected from a node/port pair
/// when given, otherwise from the variable of the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDef {
    pub name: String,
    #[serde(default = "any_type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn any_type() -> DataType {
    DataType::Any
}

/// A validated-on-load graph of nodes and connections.
///
/// Node order is preserved from the blob (insertion order) so traversal
/// tie-breaking stays deterministic across load/serialize cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    #[serde(default)]
    pub metadata: WorkflowMeta,
    #[serde(default)]
    pub nodes: IndexMap<NodeId, NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputDef>,
}

impl Workflow {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            metadata: WorkflowMeta { name: name.into(), ..Default::default() },
            ..Default::default()
        }
    }

    /// Add a node (builder-style, used heavily in tests).
    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Add a connection (builder-style).
    pub fn with_connection(mut self, conn: Connection) -> Self {
        self.connections.push(conn);
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeSpec> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
