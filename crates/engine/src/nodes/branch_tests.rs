// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::ExecutionContext;
use crate::node::LoopStates;
use armada_core::NodeId;
use serde_json::{json, Map};

async fn run_if(
    config: serde_json::Value,
    inputs: Vec<(&str, serde_json::Value)>,
    ctx: &mut ExecutionContext,
) -> Vec<String> {
    let config: Map<String, serde_json::Value> = match config {
        serde_json::Value::Object(m) => m,
        _ => Map::new(),
    };
    let node_id = NodeId::new("if1");
    let mut loops = LoopStates::new();
    let mut node_ctx = NodeCtx {
        node_id: &node_id,
        node_type: "If",
        config: &config,
        inputs: inputs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        context: ctx,
        loops: &mut loops,
    };
    match IfNode.execute(&mut node_ctx).await {
        NodeResult::Success { next_ports, .. } => next_ports,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn input_port_condition_selects_branch() {
    let mut ctx = ExecutionContext::new();
    assert_eq!(run_if(json!({}), vec![("condition", json!(true))], &mut ctx).await, vec!["true"]);
    assert_eq!(
        run_if(json!({}), vec![("condition", json!(0))], &mut ctx).await,
        vec!["false"]
    );
}

#[tokio::test]
async fn config_expression_condition() {
    let mut ctx = ExecutionContext::new();
    ctx.set_variable("v", json!(15));
    assert_eq!(
        run_if(json!({"condition": "{{v}} > 10"}), vec![], &mut ctx).await,
        vec!["true"]
    );
    assert_eq!(
        run_if(json!({"condition": "v > 100"}), vec![], &mut ctx).await,
        vec!["false"]
    );
}

#[tokio::test]
async fn missing_condition_is_false() {
    let mut ctx = ExecutionContext::new();
    assert_eq!(run_if(json!({}), vec![], &mut ctx).await, vec!["false"]);
}

#[tokio::test]
async fn non_string_config_condition_uses_truthiness() {
    let mut ctx = ExecutionContext::new();
    assert_eq!(run_if(json!({"condition": 1}), vec![], &mut ctx).await, vec!["true"]);
}

#[test]
fn eval_condition_is_fail_soft() {
    let vars = std::collections::HashMap::new();
    // Unsafe or unparseable expressions evaluate to false.
    assert!(!eval_condition("__import__('os').system('rm')", &vars));
    assert!(!eval_condition("open('x')", &vars));
    assert!(!eval_condition("missing > 1", &vars));
}

#[test]
fn eval_condition_collapses_brace_refs() {
    let mut vars = std::collections::HashMap::new();
    vars.insert("counter".to_string(), json!(5));
    assert!(eval_condition("{{counter}} < 100", &vars));
    assert!(!eval_condition("{{ counter }} >= 100", &vars));
}

#[tokio::test]
async fn try_catch_fires_try() {
    let mut ctx = ExecutionContext::new();
    let config = Map::new();
    let node_id = NodeId::new("tc");
    let mut loops = LoopStates::new();
    let mut node_ctx = NodeCtx {
        node_id: &node_id,
        node_type: "TryCatch",
        config: &config,
        inputs: Default::default(),
        context: &mut ctx,
        loops: &mut loops,
    };
    match TryCatchNode.execute(&mut node_ctx).await {
        NodeResult::Success { next_ports, .. } => assert_eq!(next_ports, vec!["try"]),
        other => panic!("unexpected {other:?}"),
    }
}
