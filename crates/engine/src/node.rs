// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node capability surface: what an implementation receives and returns.

use crate::context::ExecutionContext;
use crate::resolve::resolve_value;
use armada_core::{FailureKind, NodeId, Value};
use armada_model::NodePorts;
use async_trait::async_trait;
use serde_json::Map;
use std::collections::HashMap;

/// Per-loop iteration state, owned by the engine and keyed by the loop
/// start's NodeId. Kept out of user-visible variables.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    /// Materialized items for a for-loop (`items` mode or range mode).
    pub items: Vec<Value>,
    /// Keys when iterating a dict's values.
    pub keys: Option<Vec<Value>>,
    /// Next index for a for-loop; completed iterations for a while-loop.
    pub index: usize,
    /// Set by a Break node; observed by the loop start on re-entry.
    pub break_requested: bool,
}

/// Engine-owned map of active loop states.
pub type LoopStates = HashMap<NodeId, LoopState>;

/// Everything a node sees while executing: its identity and config, the
/// bound input ports, the run context, and the engine's loop states.
pub struct NodeCtx<'a> {
    pub node_id: &'a NodeId,
    pub node_type: &'a str,
    pub config: &'a Map<String, Value>,
    /// Input port values bound per the connection → config → default rule.
    pub inputs: HashMap<String, Value>,
    pub context: &'a mut ExecutionContext,
    pub loops: &'a mut LoopStates,
}

impl NodeCtx<'_> {
    /// Bound value of an input port (`Null` when absent).
    pub fn input(&self, port: &str) -> &Value {
        self.inputs.get(port).unwrap_or(&Value::Null)
    }

    /// Whether an input port was bound to a non-null value.
    pub fn has_input(&self, port: &str) -> bool {
        !matches!(self.input(port), Value::Null)
    }

    /// A config key resolved through the template resolver against the
    /// current variables.
    pub fn param(&self, key: &str) -> Option<Value> {
        self.config.get(key).map(|v| resolve_value(v, &self.context.variables))
    }

    /// A config key as authored, with no resolution. Loop conditions use
    /// this so the expression re-evaluates each iteration.
    pub fn raw_param(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Resolved string-typed config key with a default.
    pub fn param_str(&self, key: &str, default: &str) -> String {
        match self.param(key) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => default.to_string(),
            Some(other) => armada_core::value_to_display(&other),
        }
    }

    /// Resolved integer-typed config key with a default.
    pub fn param_i64(&self, key: &str, default: i64) -> i64 {
        self.param(key)
            .as_ref()
            .and_then(armada_core::value_as_i64)
            .unwrap_or(default)
    }
}

/// Result of executing one node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResult {
    Success {
        /// Values produced on output ports.
        outputs: HashMap<String, Value>,
        /// Execution output ports to hand control to.
        next_ports: Vec<String>,
        /// Loop re-entry target; when set the engine re-enters this node
        /// instead of following `next_ports`.
        loop_back_to: Option<NodeId>,
    },
    Failure {
        message: String,
        kind: FailureKind,
        node_id: NodeId,
    },
    Skipped {
        reason: String,
    },
}

impl NodeResult {
    /// Success continuing through a single execution port.
    pub fn next(port: impl Into<String>) -> Self {
        NodeResult::Success {
            outputs: HashMap::new(),
            next_ports: vec![port.into()],
            loop_back_to: None,
        }
    }

    /// Success with outputs, continuing through a single port.
    pub fn next_with(port: impl Into<String>, outputs: HashMap<String, Value>) -> Self {
        NodeResult::Success { outputs, next_ports: vec![port.into()], loop_back_to: None }
    }

    /// Success ending this path (no ports fired).
    pub fn halt() -> Self {
        NodeResult::Success { outputs: HashMap::new(), next_ports: Vec::new(), loop_back_to: None }
    }

    /// Success that re-enters a loop start.
    pub fn loop_back(target: NodeId) -> Self {
        NodeResult::Success {
            outputs: HashMap::new(),
            next_ports: Vec::new(),
            loop_back_to: Some(target),
        }
    }

    pub fn fail(node_id: NodeId, kind: FailureKind, message: impl Into<String>) -> Self {
        NodeResult::Failure { message: message.into(), kind, node_id }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NodeResult::Success { .. })
    }
}

/// A node implementation.
///
/// Implementations are values registered by type name; a deep inheritance
/// tree in the source system becomes this one trait plus the registry.
#[async_trait]
pub trait NodeInstance: Send + Sync {
    /// Declared ports. Config-dependent for nodes like Subflow whose
    /// outputs mirror an embedded workflow.
    fn ports(&self) -> NodePorts;

    /// Run the node. Failures are returned as data, not errors; only the
    /// executor wraps panics and timeouts around this call.
    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult;
}
