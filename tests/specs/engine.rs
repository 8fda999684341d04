// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine end-to-end scenarios: linear flow, branching, loops.

use armada_engine::{ExecutionContext, NodeRegistry, RunOutcome, WorkflowEngine};
use armada_model::{Connection, NodeSpec, Workflow};
use serde_json::json;
use std::sync::Arc;

fn run_blocking(wf: Workflow) -> (RunOutcome, ExecutionContext) {
    let engine = WorkflowEngine::new(Arc::new(wf), Arc::new(NodeRegistry::with_builtins()));
    let mut ctx = ExecutionContext::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let outcome = runtime.block_on(engine.run(&mut ctx));
    (outcome, ctx)
}

fn exec_edge(from: &str, to: &str) -> Connection {
    Connection::new(from, "exec_out", to, "exec_in")
}

#[test]
fn linear_run_sets_and_logs() {
    // Start -> Set(x=10) -> Log({{x}}) -> End
    let wf = Workflow::named("linear")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set", "SetVariable")
                .with_config("name", json!("x"))
                .with_config("value", json!(10)),
        )
        .with_node(NodeSpec::new("log", "Log").with_config("message", json!("{{ x }}")))
        .with_node(NodeSpec::new("end", "End"))
        .with_connection(exec_edge("start", "set"))
        .with_connection(exec_edge("set", "log"))
        .with_connection(exec_edge("log", "end"));

    let (outcome, _ctx) = run_blocking(wf);
    match outcome {
        RunOutcome::Completed { executed_nodes, variables } => {
            let names: Vec<&str> = executed_nodes.iter().map(|n| n.as_str()).collect();
            assert!(names.contains(&"set"));
            assert!(names.contains(&"log"));
            assert_eq!(variables.get("x"), Some(&json!(10)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn conditional_takes_the_matching_branch() {
    // Start -> Set(v=15) -> If(v > 10) -> true: Set(r=high) / false: Set(r=low) -> End
    let wf = Workflow::named("cond")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set_v", "SetVariable")
                .with_config("name", json!("v"))
                .with_config("value", json!(15)),
        )
        .with_node(NodeSpec::new("if", "If").with_config("condition", json!("{{v}} > 10")))
        .with_node(
            NodeSpec::new("high", "SetVariable")
                .with_config("name", json!("r"))
                .with_config("value", json!("high")),
        )
        .with_node(
            NodeSpec::new("low", "SetVariable")
                .with_config("name", json!("r"))
                .with_config("value", json!("low")),
        )
        .with_node(NodeSpec::new("end", "End"))
        .with_connection(exec_edge("start", "set_v"))
        .with_connection(exec_edge("set_v", "if"))
        .with_connection(Connection::new("if", "true", "high", "exec_in"))
        .with_connection(Connection::new("if", "false", "low", "exec_in"))
        .with_connection(exec_edge("high", "end"))
        .with_connection(exec_edge("low", "end"));

    let (outcome, _ctx) = run_blocking(wf);
    match outcome {
        RunOutcome::Completed { executed_nodes, variables } => {
            assert_eq!(variables.get("r"), Some(&json!("high")));
            assert!(!executed_nodes.iter().any(|n| n == "low"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn for_loop_sums_the_list() {
    // Iterate [1..5], accumulate into total (initialized to 0).
    let wf = Workflow::named("sum")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("init", "SetVariable")
                .with_config("name", json!("total"))
                .with_config("value", json!(0)),
        )
        .with_node(
            NodeSpec::new("loop", "ForLoopStart").with_config("items", json!([1, 2, 3, 4, 5])),
        )
        .with_node(
            NodeSpec::new("add", "SetVariable")
                .with_config("name", json!("total"))
                .with_config("value", json!("{{ total + item }}")),
        )
        .with_node(
            NodeSpec::new("loop_end", "ForLoopEnd")
                .with_config("paired_start_id", json!("loop")),
        )
        .with_node(NodeSpec::new("end", "End"))
        .with_connection(exec_edge("start", "init"))
        .with_connection(exec_edge("init", "loop"))
        .with_connection(Connection::new("loop", "body", "add", "exec_in"))
        .with_connection(exec_edge("add", "loop_end"))
        .with_connection(Connection::new("loop", "completed", "end", "exec_in"));

    let engine = WorkflowEngine::new(
        Arc::new(wf),
        Arc::new(NodeRegistry::with_builtins()),
    );
    let mut completed_events = 0;
    let mut rx = engine.events().subscribe();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let mut ctx = ExecutionContext::new();
    let outcome = runtime.block_on(engine.run(&mut ctx));

    while let Ok(event) = rx.try_recv() {
        if let armada_core::RunEvent::NodeCompleted { node_id, .. } = event {
            if node_id == "end" {
                completed_events += 1;
            }
        }
    }

    match outcome {
        RunOutcome::Completed { variables, .. } => {
            assert_eq!(variables.get("total"), Some(&json!(15)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(completed_events, 1, "completed fires exactly once");
}
