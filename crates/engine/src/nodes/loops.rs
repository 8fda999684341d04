// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loop control nodes.
//!
//! Loops are paired start/end nodes with ordinary nodes between them on
//! the execution path. The start owns iteration state (engine-side, keyed
//! by its NodeId); the end hands control back via `loop_back_to`. Break
//! and Continue route through the start as well, so the start is the only
//! place iteration decisions are made.

use crate::node::{LoopState, NodeCtx, NodeInstance, NodeResult};
use armada_core::{value_as_i64, Value};
use armada_model::{DataType, NodePorts, PortDef};
use async_trait::async_trait;
use std::collections::HashMap;

/// Variable suffixes written alongside `item_var`.
const KEY_SUFFIX: &str = "_key";
const INDEX_SUFFIX: &str = "_index";

/// Counter or collection iteration.
///
/// Modes:
/// - `items`: iterate a list, a dict (over values, exposing keys), a
///   string (over characters), or a scalar (single iteration);
/// - `range`: iterate `start..end` by `step`.
pub struct ForLoopStartNode;

impl ForLoopStartNode {
    fn materialize(ctx: &NodeCtx<'_>) -> (Vec<Value>, Option<Vec<Value>>) {
        let mode = ctx.param_str("mode", "items");
        if mode == "range" {
            return (Self::range_items(ctx), None);
        }

        // Items mode: input port, then a named context variable.
        let mut items = ctx.input("items").clone();
        if items.is_null() {
            let list_var = ctx.param_str("list_var", "");
            if !list_var.is_empty() {
                items = ctx.context.get_variable_or(&list_var, Value::Null);
            }
        }

        match items {
            // No items anywhere: fall back to range config.
            Value::Null => (Self::range_items(ctx), None),
            Value::Array(values) => (values, None),
            Value::Object(map) => {
                let keys = map.keys().cloned().map(Value::String).collect();
                let values = map.values().cloned().collect();
                (values, Some(keys))
            }
            Value::String(s) => {
                (s.chars().map(|c| Value::String(c.to_string())).collect(), None)
            }
            single => (vec![single], None),
        }
    }

    fn range_items(ctx: &NodeCtx<'_>) -> Vec<Value> {
        let start = ctx.param_i64("start", 0);
        let end = if ctx.has_input("end") {
            value_as_i64(ctx.input("end")).unwrap_or(10)
        } else {
            ctx.param_i64("end", 10)
        };
        let step = ctx.param_i64("step", 1).max(1);
        let mut items = Vec::new();
        let mut v = start;
        while v < end {
            items.push(Value::from(v));
            v += step;
        }
        items
    }
}

#[async_trait]
impl NodeInstance for ForLoopStartNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("body"),
            PortDef::exec_out("completed"),
            PortDef::input("items", DataType::Any),
            PortDef::input("end", DataType::Integer),
            PortDef::output("current_item", DataType::Any),
            PortDef::output("current_index", DataType::Integer),
            PortDef::output("current_key", DataType::Any),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        if !ctx.loops.contains_key(ctx.node_id) {
            let (items, keys) = Self::materialize(ctx);
            ctx.loops.insert(
                ctx.node_id.clone(),
                LoopState { items, keys, index: 0, break_requested: false },
            );
        }

        // Consulted (and possibly removed) on every entry, so take a
        // snapshot of what this iteration needs first.
        let (index, total, item, key, done) = {
            let state = &ctx.loops[ctx.node_id];
            let done = state.break_requested || state.index >= state.items.len();
            let item = state.items.get(state.index).cloned();
            let key = state
                .keys
                .as_ref()
                .and_then(|keys| keys.get(state.index))
                .cloned();
            (state.index, state.items.len(), item, key, done)
        };

        if done {
            ctx.loops.remove(ctx.node_id);
            tracing::debug!(node = %ctx.node_id, iterations = index, "for loop completed");
            return NodeResult::next("completed");
        }

        let item = item.unwrap_or(Value::Null);
        let item_var = ctx.param_str("item_var", "item");
        if !item_var.is_empty() {
            ctx.context.set_variable(item_var.clone(), item.clone());
            ctx.context
                .set_variable(format!("{item_var}{INDEX_SUFFIX}"), Value::from(index as i64));
            if let Some(k) = &key {
                ctx.context.set_variable(format!("{item_var}{KEY_SUFFIX}"), k.clone());
            }
        }

        if let Some(state) = ctx.loops.get_mut(ctx.node_id) {
            state.index = index + 1;
        }

        tracing::debug!(node = %ctx.node_id, index, total, "for loop iteration");

        let mut outputs = HashMap::new();
        outputs.insert("current_item".to_string(), item);
        outputs.insert("current_index".to_string(), Value::from(index as i64));
        outputs.insert("current_key".to_string(), key.unwrap_or(Value::Null));
        NodeResult::next_with("body", outputs)
    }
}

/// Closes a for-loop body; loops back to the paired start.
pub struct ForLoopEndNode;

#[async_trait]
impl NodeInstance for ForLoopEndNode {
    fn ports(&self) -> NodePorts {
        loop_end_ports()
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        loop_end_execute(ctx, "ForLoopStart")
    }
}

/// Condition-based iteration with a safety bound.
pub struct WhileLoopStartNode;

const DEFAULT_MAX_ITERATIONS: i64 = 1_000;

#[async_trait]
impl NodeInstance for WhileLoopStartNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("body"),
            PortDef::exec_out("completed"),
            PortDef::input("condition", DataType::Boolean),
            PortDef::output("current_iteration", DataType::Integer),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let (iteration, break_requested) = {
            let state = ctx.loops.entry(ctx.node_id.clone()).or_default();
            (state.index, state.break_requested)
        };

        if break_requested {
            ctx.loops.remove(ctx.node_id);
            tracing::debug!(node = %ctx.node_id, iterations = iteration, "while loop broke");
            return NodeResult::next("completed");
        }

        let max_iterations = ctx.param_i64("max_iterations", DEFAULT_MAX_ITERATIONS).max(1);
        if iteration as i64 >= max_iterations {
            ctx.loops.remove(ctx.node_id);
            tracing::warn!(
                node = %ctx.node_id,
                max_iterations,
                "while loop hit its iteration bound"
            );
            return NodeResult::next("completed");
        }

        let proceed = crate::nodes::branch::decide(ctx, "condition");

        if !proceed {
            ctx.loops.remove(ctx.node_id);
            tracing::debug!(node = %ctx.node_id, iterations = iteration, "while loop completed");
            return NodeResult::next("completed");
        }

        if let Some(state) = ctx.loops.get_mut(ctx.node_id) {
            state.index = iteration + 1;
        }

        let mut outputs = HashMap::new();
        outputs.insert("current_iteration".to_string(), Value::from(iteration as i64));
        NodeResult::next_with("body", outputs)
    }
}

/// Closes a while-loop body; loops back to the paired start.
pub struct WhileLoopEndNode;

#[async_trait]
impl NodeInstance for WhileLoopEndNode {
    fn ports(&self) -> NodePorts {
        loop_end_ports()
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        loop_end_execute(ctx, "WhileLoopStart")
    }
}

fn loop_end_ports() -> NodePorts {
    NodePorts::new(vec![PortDef::exec_in("exec_in"), PortDef::exec_out("exec_out")])
}

fn loop_end_execute(ctx: &mut NodeCtx<'_>, expected_start: &str) -> NodeResult {
    let start_id = ctx.param_str("paired_start_id", "");
    if start_id.is_empty() {
        tracing::warn!(node = %ctx.node_id, "loop end has no paired {expected_start}");
        return NodeResult::next("exec_out");
    }
    let start = armada_core::NodeId::new(start_id);

    // No live state: the loop already completed, fall through.
    if !ctx.loops.contains_key(&start) {
        return NodeResult::next("exec_out");
    }

    NodeResult::loop_back(start)
}

/// Requests loop exit: flags the paired start and returns to it.
pub struct BreakNode;

#[async_trait]
impl NodeInstance for BreakNode {
    fn ports(&self) -> NodePorts {
        loop_end_ports()
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let start_id = ctx.param_str("paired_loop_start_id", "");
        let start = armada_core::NodeId::new(start_id);
        match ctx.loops.get_mut(&start) {
            Some(state) => {
                state.break_requested = true;
                NodeResult::loop_back(start)
            }
            None => {
                tracing::warn!(node = %ctx.node_id, "break outside an active loop");
                NodeResult::next("exec_out")
            }
        }
    }
}

/// Skips to the next iteration: returns to the paired start directly.
pub struct ContinueNode;

#[async_trait]
impl NodeInstance for ContinueNode {
    fn ports(&self) -> NodePorts {
        loop_end_ports()
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let start_id = ctx.param_str("paired_loop_start_id", "");
        let start = armada_core::NodeId::new(start_id);
        if ctx.loops.contains_key(&start) {
            NodeResult::loop_back(start)
        } else {
            tracing::warn!(node = %ctx.node_id, "continue outside an active loop");
            NodeResult::next("exec_out")
        }
    }
}

#[cfg(test)]
#[path = "loops_tests.rs"]
mod tests;
