// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    pending = { RunState::Pending, false },
    running = { RunState::Running, false },
    completed = { RunState::Completed, true },
    failed = { RunState::Failed, true },
    cancelled = { RunState::Cancelled, true },
)]
fn terminal_states(state: RunState, terminal: bool) {
    assert_eq!(state.is_terminal(), terminal);
}

#[test]
fn new_checkpoint_is_pending_and_empty() {
    let cp = Checkpoint::new(JobId::new("job-1"), "hash", 42);
    assert_eq!(cp.state, RunState::Pending);
    assert!(cp.executed_nodes.is_empty());
    assert!(cp.step_results.is_empty());
    assert_eq!(cp.created_at_ms, 42);
    assert_eq!(cp.updated_at_ms, 42);
    assert!(!cp.is_terminal());
}

#[test]
fn checkpoint_round_trips_through_json() {
    let mut cp = Checkpoint::new(JobId::new("job-rt"), "abc", 1);
    cp.state = RunState::Running;
    cp.executed_nodes.push(NodeId::new("n1"));
    cp.variables.insert("x".to_string(), json!(10));
    cp.step_results.insert(
        NodeId::new("n1"),
        ReplayedStep {
            outputs: [("value".to_string(), json!(10))].into(),
            next_ports: vec!["exec_out".to_string()],
        },
    );
    cp.error = Some("partial".to_string());

    let encoded = serde_json::to_string(&cp).unwrap();
    let decoded: Checkpoint = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, cp);
}
