// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::node::LoopStates;
use crate::registry::NodeRegistry;
use armada_core::{NodeId, RunEvent};
use armada_model::{Connection, NodeSpec, Workflow};
use serde_json::json;

fn wf_with(node: NodeSpec) -> Workflow {
    Workflow::default().with_node(node)
}

async fn run_node(
    workflow: &Workflow,
    node: &str,
    ctx: &mut ExecutionContext,
) -> (NodeResult, Vec<RunEvent>) {
    let registry = NodeRegistry::with_builtins();
    let events = RunEvents::new();
    let mut rx = events.subscribe();
    let executor = NodeExecutor::new(events);

    let id = NodeId::new(node);
    let spec = workflow.node(&id).unwrap().clone();
    let instance = registry.instantiate(&spec).unwrap();
    let mut loops = LoopStates::new();
    let result = executor
        .execute(workflow, &spec, instance.as_ref(), ctx, &mut loops, ProgressHint::default())
        .await;

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    (result, seen)
}

#[tokio::test]
async fn connection_binding_wins_over_config() {
    let wf = Workflow::default()
        .with_node(
            NodeSpec::new("producer", "SetVariable")
                .with_config("name", json!("p"))
                .with_config("value", json!("from-producer")),
        )
        .with_node(
            NodeSpec::new("consumer", "SetVariable")
                .with_config("name", json!("c"))
                .with_config("value", json!("from-config")),
        )
        .with_connection(Connection::new("producer", "value", "consumer", "value"));

    let mut ctx = ExecutionContext::new();
    let (result, _) = run_node(&wf, "producer", &mut ctx).await;
    assert!(result.is_success());

    let (result, _) = run_node(&wf, "consumer", &mut ctx).await;
    assert!(result.is_success());
    // The connected producer output wins over the config literal.
    assert_eq!(ctx.get_variable("c"), Some(&json!("from-producer")));
}

#[tokio::test]
async fn config_binding_resolves_templates() {
    let wf = wf_with(
        NodeSpec::new("set", "SetVariable")
            .with_config("name", json!("doubled"))
            .with_config("value", json!("{{ n * 2 }}")),
    );
    let mut ctx = ExecutionContext::new();
    ctx.set_variable("n", json!(21));

    let (result, _) = run_node(&wf, "set", &mut ctx).await;
    assert!(result.is_success());
    assert_eq!(ctx.get_variable("doubled"), Some(&json!(42)));
}

#[test]
fn default_binding_applies_when_unconfigured() {
    let registry = NodeRegistry::with_builtins();
    let spec = NodeSpec::new("wait", "Wait");
    let wf = wf_with(spec.clone());
    let instance = registry.instantiate(&spec).unwrap();
    let ctx = ExecutionContext::new();

    let bound = bind_inputs(&wf, &spec, instance.as_ref(), &ctx).unwrap();
    assert_eq!(bound["seconds"], json!(1.0));
}

#[tokio::test]
async fn missing_name_fails_with_input_kind() {
    let wf = wf_with(NodeSpec::new("set", "SetVariable").with_config("value", json!(1)));
    let mut ctx = ExecutionContext::new();
    let (result, events) = run_node(&wf, "set", &mut ctx).await;
    match result {
        NodeResult::Failure { kind, node_id, .. } => {
            assert_eq!(kind, FailureKind::Input);
            assert_eq!(node_id.as_str(), "set");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(events.iter().any(|e| matches!(e, RunEvent::NodeFailed { .. })));
}

#[tokio::test]
async fn node_timeout_fires() {
    let wf = wf_with(
        NodeSpec::new("wait", "Wait")
            .with_config("seconds", json!(5.0))
            .with_config("timeout_secs", json!(0.05)),
    );
    let mut ctx = ExecutionContext::new();
    let started = std::time::Instant::now();
    let (result, _) = run_node(&wf, "wait", &mut ctx).await;
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert!(matches!(
        result,
        NodeResult::Failure { kind: FailureKind::Timeout, .. }
    ));
}

#[tokio::test]
async fn cancellation_preempts_invocation() {
    let wf = wf_with(NodeSpec::new("log", "Log").with_config("message", json!("hi")));
    let mut ctx = ExecutionContext::new();
    ctx.cancel.cancel();
    let (result, _) = run_node(&wf, "log", &mut ctx).await;
    assert!(matches!(
        result,
        NodeResult::Failure { kind: FailureKind::Cancelled, .. }
    ));
}

#[tokio::test]
async fn success_stores_outputs_and_emits_events() {
    let wf = wf_with(
        NodeSpec::new("set", "SetVariable")
            .with_config("name", json!("x"))
            .with_config("value", json!(5)),
    );
    let mut ctx = ExecutionContext::new();
    let (result, events) = run_node(&wf, "set", &mut ctx).await;
    assert!(result.is_success());
    assert_eq!(ctx.output(&"set".into(), "value"), Some(&json!(5)));

    assert!(matches!(events[0], RunEvent::NodeStarted { .. }));
    assert!(matches!(events[1], RunEvent::NodeCompleted { .. }));
}

#[tokio::test]
async fn debug_gate_blocks_breakpoint_nodes() {
    let registry = NodeRegistry::with_builtins();
    let events = RunEvents::new();
    let gate = Arc::new(DebugGate::new());
    let executor =
        Arc::new(NodeExecutor::new(events).with_debug_gate(gate.clone()));

    let wf = Arc::new(wf_with(
        NodeSpec::new("log", "Log")
            .with_config("message", json!("stop here"))
            .with_config("breakpoint", json!(true)),
    ));

    let spec = wf.node(&"log".into()).unwrap().clone();
    let wf2 = wf.clone();
    let exec2 = executor.clone();
    let task = tokio::spawn(async move {
        let registry = registry;
        let instance = registry.instantiate(&spec).unwrap();
        let mut ctx = ExecutionContext::new();
        let mut loops = LoopStates::new();
        exec2
            .execute(&wf2, &spec, instance.as_ref(), &mut ctx, &mut loops, ProgressHint::default())
            .await
    });

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert!(!task.is_finished(), "breakpoint should hold the node");

    gate.step();
    let result = tokio::time::timeout(std::time::Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_success());
}
