// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::ExecutionContext;
use crate::node::LoopStates;
use armada_core::NodeId;
use serde_json::{json, Map};

struct Harness {
    ctx: ExecutionContext,
    loops: LoopStates,
}

impl Harness {
    fn new() -> Self {
        Self { ctx: ExecutionContext::new(), loops: LoopStates::new() }
    }

    async fn run(
        &mut self,
        node: &dyn NodeInstance,
        id: &str,
        config: serde_json::Value,
        inputs: Vec<(&str, serde_json::Value)>,
    ) -> NodeResult {
        let config: Map<String, serde_json::Value> = match config {
            serde_json::Value::Object(m) => m,
            _ => Map::new(),
        };
        let node_id = NodeId::new(id);
        let mut node_ctx = NodeCtx {
            node_id: &node_id,
            node_type: "loop",
            config: &config,
            inputs: inputs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            context: &mut self.ctx,
            loops: &mut self.loops,
        };
        node.execute(&mut node_ctx).await
    }
}

fn ports_of(result: &NodeResult) -> Vec<String> {
    match result {
        NodeResult::Success { next_ports, .. } => next_ports.clone(),
        other => panic!("expected success, got {other:?}"),
    }
}

fn outputs_of(result: &NodeResult) -> std::collections::HashMap<String, serde_json::Value> {
    match result {
        NodeResult::Success { outputs, .. } => outputs.clone(),
        other => panic!("expected success, got {other:?}"),
    }
}

// --- ForLoopStart ---

#[tokio::test]
async fn for_loop_iterates_list_then_completes() {
    let mut h = Harness::new();
    let items = json!([10, 20, 30]);

    for expected_index in 0..3 {
        let result = h
            .run(&ForLoopStartNode, "loop", json!({}), vec![("items", items.clone())])
            .await;
        assert_eq!(ports_of(&result), vec!["body"]);
        let outputs = outputs_of(&result);
        assert_eq!(outputs["current_index"], json!(expected_index));
        assert_eq!(outputs["current_item"], json!((expected_index + 1) * 10));
        assert_eq!(h.ctx.get_variable("item"), Some(&json!((expected_index + 1) * 10)));
        assert_eq!(h.ctx.get_variable("item_index"), Some(&json!(expected_index)));
    }

    let result = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", items)])
        .await;
    assert_eq!(ports_of(&result), vec!["completed"]);
    assert!(h.loops.is_empty());
}

#[tokio::test]
async fn for_loop_iterates_dict_values_with_keys() {
    let mut h = Harness::new();
    let items = json!({"a": 1, "b": 2});

    let first = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", items.clone())])
        .await;
    let outputs = outputs_of(&first);
    assert_eq!(outputs["current_item"], json!(1));
    assert_eq!(outputs["current_key"], json!("a"));
    assert_eq!(h.ctx.get_variable("item_key"), Some(&json!("a")));

    let second = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", items)])
        .await;
    assert_eq!(outputs_of(&second)["current_key"], json!("b"));
}

#[tokio::test]
async fn for_loop_range_mode() {
    let mut h = Harness::new();
    let config = json!({"mode": "range", "start": 2, "end": 8, "step": 2});

    let mut seen = Vec::new();
    loop {
        let result = h.run(&ForLoopStartNode, "loop", config.clone(), vec![]).await;
        if ports_of(&result) == vec!["completed"] {
            break;
        }
        seen.push(outputs_of(&result)["current_item"].clone());
    }
    assert_eq!(seen, vec![json!(2), json!(4), json!(6)]);
}

#[tokio::test]
async fn for_loop_string_iterates_characters() {
    let mut h = Harness::new();
    let result = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", json!("ab"))])
        .await;
    assert_eq!(outputs_of(&result)["current_item"], json!("a"));
}

#[tokio::test]
async fn for_loop_scalar_is_single_iteration() {
    let mut h = Harness::new();
    let first = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", json!(7))])
        .await;
    assert_eq!(ports_of(&first), vec!["body"]);
    let second = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", json!(7))])
        .await;
    assert_eq!(ports_of(&second), vec!["completed"]);
}

#[tokio::test]
async fn for_loop_reads_list_var_from_context() {
    let mut h = Harness::new();
    h.ctx.set_variable("rows", json!(["x", "y"]));
    let result = h
        .run(&ForLoopStartNode, "loop", json!({"list_var": "rows"}), vec![])
        .await;
    assert_eq!(outputs_of(&result)["current_item"], json!("x"));
}

#[tokio::test]
async fn for_loop_custom_item_var() {
    let mut h = Harness::new();
    h.run(
        &ForLoopStartNode,
        "loop",
        json!({"item_var": "row"}),
        vec![("items", json!([5]))],
    )
    .await;
    assert_eq!(h.ctx.get_variable("row"), Some(&json!(5)));
    assert_eq!(h.ctx.get_variable("row_index"), Some(&json!(0)));
}

#[tokio::test]
async fn for_loop_break_flag_completes() {
    let mut h = Harness::new();
    let items = json!([1, 2, 3]);
    h.run(&ForLoopStartNode, "loop", json!({}), vec![("items", items.clone())]).await;

    // Break inside the body flags the state and returns to the start.
    let brk = h
        .run(&BreakNode, "brk", json!({"paired_loop_start_id": "loop"}), vec![])
        .await;
    match brk {
        NodeResult::Success { loop_back_to: Some(target), .. } => {
            assert_eq!(target.as_str(), "loop");
        }
        other => panic!("unexpected {other:?}"),
    }

    let result = h
        .run(&ForLoopStartNode, "loop", json!({}), vec![("items", items)])
        .await;
    assert_eq!(ports_of(&result), vec!["completed"]);
}

// --- loop ends / continue ---

#[tokio::test]
async fn loop_end_loops_back_while_state_is_live() {
    let mut h = Harness::new();
    h.run(&ForLoopStartNode, "loop", json!({}), vec![("items", json!([1, 2]))]).await;

    let end = h
        .run(&ForLoopEndNode, "end", json!({"paired_start_id": "loop"}), vec![])
        .await;
    assert!(matches!(end, NodeResult::Success { loop_back_to: Some(_), .. }));
}

#[tokio::test]
async fn loop_end_falls_through_after_completion() {
    let mut h = Harness::new();
    let end = h
        .run(&ForLoopEndNode, "end", json!({"paired_start_id": "loop"}), vec![])
        .await;
    assert_eq!(ports_of(&end), vec!["exec_out"]);
}

#[tokio::test]
async fn unpaired_loop_end_falls_through() {
    let mut h = Harness::new();
    let end = h.run(&ForLoopEndNode, "end", json!({}), vec![]).await;
    assert_eq!(ports_of(&end), vec!["exec_out"]);
}

#[tokio::test]
async fn continue_loops_back_without_flagging() {
    let mut h = Harness::new();
    h.run(&ForLoopStartNode, "loop", json!({}), vec![("items", json!([1, 2]))]).await;

    let cont = h
        .run(&ContinueNode, "cont", json!({"paired_loop_start_id": "loop"}), vec![])
        .await;
    assert!(matches!(cont, NodeResult::Success { loop_back_to: Some(_), .. }));
    assert!(!h.loops[&NodeId::new("loop")].break_requested);
}

#[tokio::test]
async fn break_outside_loop_falls_through() {
    let mut h = Harness::new();
    let brk = h
        .run(&BreakNode, "brk", json!({"paired_loop_start_id": "loop"}), vec![])
        .await;
    assert_eq!(ports_of(&brk), vec!["exec_out"]);
}

// --- WhileLoopStart ---

#[tokio::test]
async fn while_loop_runs_until_condition_false() {
    let mut h = Harness::new();
    h.ctx.set_variable("counter", json!(0));
    let config = json!({"condition": "{{counter}} < 3"});

    let mut iterations = 0;
    loop {
        let result = h.run(&WhileLoopStartNode, "wl", config.clone(), vec![]).await;
        if ports_of(&result) == vec!["completed"] {
            break;
        }
        iterations += 1;
        let next = h.ctx.get_variable("counter").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
        h.ctx.set_variable("counter", json!(next));
    }
    assert_eq!(iterations, 3);
}

#[tokio::test]
async fn while_loop_honors_max_iterations() {
    let mut h = Harness::new();
    let config = json!({"condition": "true", "max_iterations": 5});

    let mut iterations = 0;
    loop {
        let result = h.run(&WhileLoopStartNode, "wl", config.clone(), vec![]).await;
        if ports_of(&result) == vec!["completed"] {
            break;
        }
        iterations += 1;
        assert!(iterations <= 5, "loop must stop at the bound");
    }
    assert_eq!(iterations, 5);
}

#[tokio::test]
async fn while_loop_condition_from_input_port() {
    let mut h = Harness::new();
    let result = h
        .run(&WhileLoopStartNode, "wl", json!({}), vec![("condition", json!(false))])
        .await;
    assert_eq!(ports_of(&result), vec!["completed"]);
}

#[tokio::test]
async fn while_loop_without_condition_completes_immediately() {
    let mut h = Harness::new();
    let result = h.run(&WhileLoopStartNode, "wl", json!({}), vec![]).await;
    assert_eq!(ports_of(&result), vec!["completed"]);
}

#[tokio::test]
async fn while_loop_reports_iteration_outputs() {
    let mut h = Harness::new();
    let config = json!({"condition": "true", "max_iterations": 2});
    let first = h.run(&WhileLoopStartNode, "wl", config.clone(), vec![]).await;
    assert_eq!(outputs_of(&first)["current_iteration"], json!(0));
    let second = h.run(&WhileLoopStartNode, "wl", config, vec![]).await;
    assert_eq!(outputs_of(&second)["current_iteration"], json!(1));
}
