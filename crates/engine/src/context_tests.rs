// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use armada_core::FailureKind;
use serde_json::json;
use std::time::Duration;

#[test]
fn variables_are_total() {
    let mut ctx = ExecutionContext::new();
    assert_eq!(ctx.get_variable("x"), None);
    assert_eq!(ctx.get_variable_or("x", json!(0)), json!(0));

    ctx.set_variable("x", json!(10));
    assert_eq!(ctx.get_variable("x"), Some(&json!(10)));

    ctx.set_variable("x", json!(11));
    assert_eq!(ctx.get_variable("x"), Some(&json!(11)));
}

#[test]
fn outputs_lookup() {
    let mut ctx = ExecutionContext::new();
    ctx.outputs_by_node
        .entry("n1".into())
        .or_default()
        .insert("result".to_string(), json!(42));
    assert_eq!(ctx.output(&"n1".into(), "result"), Some(&json!(42)));
    assert_eq!(ctx.output(&"n1".into(), "other"), None);
    assert_eq!(ctx.output(&"n2".into(), "result"), None);
}

#[test]
fn clone_for_branch_copies_variables() {
    let mut root = ExecutionContext::new();
    root.set_variable("x", json!(1));

    let mut clone = root.clone_for_branch("left");
    clone.set_variable("x", json!(2));
    clone.set_variable("y", json!(3));

    // Writes in the clone do not propagate back.
    assert_eq!(root.get_variable("x"), Some(&json!(1)));
    assert_eq!(root.get_variable("y"), None);
    assert_eq!(clone.branch, "left");
}

#[test]
fn clone_for_branch_shares_resources() {
    let root = ExecutionContext::new();
    let clone = root.clone_for_branch("b");
    clone.resources.insert("browser", std::sync::Arc::new(7u32));
    assert!(root.resources.contains("browser"));
}

#[test]
fn clone_for_branch_shares_signals() {
    let root = ExecutionContext::new();
    let clone = root.clone_for_branch("b");
    root.cancel.cancel();
    assert!(clone.cancel.is_cancelled());
}

#[test]
fn record_error_appends() {
    let mut ctx = ExecutionContext::new();
    ctx.record_error(armada_core::RunError::new(None, "a", FailureKind::Runtime, 1));
    ctx.record_error(armada_core::RunError::new(None, "b", FailureKind::Timeout, 2));
    assert_eq!(ctx.errors.len(), 2);
    assert_eq!(ctx.errors[1].message, "b");
}

#[tokio::test]
async fn wait_if_paused_returns_immediately_when_running() {
    let ctx = ExecutionContext::new();
    assert!(!ctx.pause.is_paused());
    // Must not block.
    tokio::time::timeout(Duration::from_millis(50), ctx.wait_if_paused())
        .await
        .unwrap();
}

#[tokio::test]
async fn wait_if_paused_blocks_until_resumed() {
    let ctx = ExecutionContext::new();
    ctx.pause.pause();
    assert!(ctx.pause.is_paused());

    let pause = ctx.pause.clone();
    let waiter = tokio::spawn(async move {
        pause.wait().await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    ctx.pause.resume();
    tokio::time::timeout(Duration::from_millis(200), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn cancellation_wakes_a_paused_wait() {
    let ctx = ExecutionContext::new();
    ctx.pause.pause();

    let clone = ctx.clone_for_branch("b");
    let waiter = tokio::spawn(async move {
        clone.wait_if_paused().await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel.cancel();
    tokio::time::timeout(Duration::from_millis(200), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn cancelled_future_resolves_after_the_fact() {
    let signal = CancelSignal::new();
    signal.cancel();
    // Already-cancelled resolves immediately.
    tokio::time::timeout(Duration::from_millis(50), signal.cancelled())
        .await
        .unwrap();
}
