// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow entry/exit and utility nodes.

use crate::node::{NodeCtx, NodeInstance, NodeResult};
use armada_core::{value_to_display, FailureKind, Value};
use armada_model::{DataType, NodePorts, PortDef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Workflow entry point. At most one per graph.
pub struct StartNode;

#[async_trait]
impl NodeInstance for StartNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![PortDef::exec_out("exec_out")])
    }

    async fn execute(&self, _ctx: &mut NodeCtx<'_>) -> NodeResult {
        NodeResult::next("exec_out")
    }
}

/// Terminates an execution path.
pub struct EndNode;

#[async_trait]
impl NodeInstance for EndNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![PortDef::exec_in("exec_in")])
    }

    async fn execute(&self, _ctx: &mut NodeCtx<'_>) -> NodeResult {
        NodeResult::halt()
    }
}

/// Writes a variable into the run context.
///
/// The value comes from the `value` input port when connected, otherwise
/// from the resolved `value` config key.
pub struct SetVariableNode;

#[async_trait]
impl NodeInstance for SetVariableNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("exec_out"),
            PortDef::input("value", DataType::Any),
            PortDef::output("value", DataType::Any),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let name = ctx.param_str("name", "");
        if name.is_empty() {
            return NodeResult::fail(
                ctx.node_id.clone(),
                FailureKind::Input,
                "SetVariable requires a 'name' config value",
            );
        }
        let value = ctx.input("value").clone();
        ctx.context.set_variable(name, value.clone());

        let mut outputs = HashMap::new();
        outputs.insert("value".to_string(), value);
        NodeResult::next_with("exec_out", outputs)
    }
}

/// Logs a resolved message.
pub struct LogNode;

#[async_trait]
impl NodeInstance for LogNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("exec_out"),
            PortDef::input("message", DataType::Any),
            PortDef::output("message", DataType::String),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let message = if ctx.has_input("message") {
            value_to_display(ctx.input("message"))
        } else {
            ctx.param_str("message", "")
        };

        match ctx.param_str("level", "info").as_str() {
            "debug" => tracing::debug!(node = %ctx.node_id, "{message}"),
            "warn" => tracing::warn!(node = %ctx.node_id, "{message}"),
            "error" => tracing::error!(node = %ctx.node_id, "{message}"),
            _ => tracing::info!(node = %ctx.node_id, "{message}"),
        }

        let mut outputs = HashMap::new();
        outputs.insert("message".to_string(), Value::String(message));
        NodeResult::next_with("exec_out", outputs)
    }
}

/// Sleeps for a configured number of seconds (subject to the node
/// timeout).
pub struct WaitNode;

#[async_trait]
impl NodeInstance for WaitNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("exec_out"),
            PortDef::input("seconds", DataType::Float)
                .with_default(serde_json::json!(1.0)),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let seconds = ctx.input("seconds").as_f64().unwrap_or(1.0).max(0.0);
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        NodeResult::next("exec_out")
    }
}

/// Annotation on the canvas; passes control through untouched.
pub struct CommentNode;

#[async_trait]
impl NodeInstance for CommentNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![PortDef::exec_in("exec_in"), PortDef::exec_out("exec_out")])
    }

    async fn execute(&self, _ctx: &mut NodeCtx<'_>) -> NodeResult {
        NodeResult::next("exec_out")
    }
}

#[cfg(test)]
#[path = "basic_tests.rs"]
mod tests;
