// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branching nodes.

use crate::expr;
use crate::node::{NodeCtx, NodeInstance, NodeResult};
use armada_core::{value_truthy, Value};
use armada_model::{DataType, NodePorts, PortDef};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{name}}` references inside a condition expression collapse to bare
/// identifiers before parsing, matching how flows author conditions.
#[allow(clippy::expect_used)]
static BRACE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("constant regex pattern is valid"));

/// Evaluate a condition config string against run variables.
///
/// Fail-soft: an unsafe or failing expression is logged and counts as
/// false rather than failing the node.
pub(crate) fn eval_condition(raw: &str, vars: &HashMap<String, Value>) -> bool {
    let source = BRACE_REF.replace_all(raw, "$1");
    match expr::eval_str(&source, vars) {
        Ok(value) => value_truthy(&value),
        Err(e) => {
            tracing::warn!(expression = raw, error = %e, "condition evaluation failed");
            false
        }
    }
}

/// Decide a boolean from a condition port/config.
///
/// A bound string is an expression to evaluate (template references have
/// already been substituted by binding, e.g. `"15 > 10"`); other bound
/// values use truthiness; an unbound port falls back to the raw config
/// expression.
pub(crate) fn decide(ctx: &NodeCtx<'_>, port: &str) -> bool {
    match ctx.input(port) {
        Value::String(s) => eval_condition(s, &ctx.context.variables),
        Value::Null => match ctx.raw_param(port) {
            Some(Value::String(raw)) => eval_condition(raw, &ctx.context.variables),
            Some(other) => value_truthy(other),
            None => false,
        },
        other => value_truthy(other),
    }
}

/// Two-way branch: fires `true` or `false` based on a condition.
///
/// The condition comes from the `condition` input port when connected,
/// otherwise from the `condition` config expression.
pub struct IfNode;

#[async_trait]
impl NodeInstance for IfNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("true"),
            PortDef::exec_out("false"),
            PortDef::input("condition", DataType::Any),
            PortDef::output("result", DataType::Boolean),
        ])
    }

    async fn execute(&self, ctx: &mut NodeCtx<'_>) -> NodeResult {
        let outcome = decide(ctx, "condition");
        let mut outputs = HashMap::new();
        outputs.insert("result".to_string(), Value::Bool(outcome));
        NodeResult::next_with(if outcome { "true" } else { "false" }, outputs)
    }
}

/// Error boundary. Fires `try`; the engine routes failures of nodes
/// reachable from `try` to the `catch` branch.
pub struct TryCatchNode;

#[async_trait]
impl NodeInstance for TryCatchNode {
    fn ports(&self) -> NodePorts {
        NodePorts::new(vec![
            PortDef::exec_in("exec_in"),
            PortDef::exec_out("try"),
            PortDef::exec_out("catch"),
            PortDef::output("error_message", DataType::String),
            PortDef::output("error_node", DataType::String),
        ])
    }

    async fn execute(&self, _ctx: &mut NodeCtx<'_>) -> NodeResult {
        NodeResult::next("try")
    }
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;
