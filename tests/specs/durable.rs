// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable runtime scenario: idempotent resume.

use armada_core::{FakeClock, JobId, RunEvent};
use armada_durable::{CheckpointStore, DurableRuntime, MemoryStore, RunRequest, RunState};
use armada_engine::{NodeRegistry, RunEvents};
use armada_model::{Connection, NodeSpec, Workflow};
use serde_json::json;
use std::sync::Arc;

fn linear_blob() -> String {
    Workflow::named("linear")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set", "SetVariable")
                .with_config("name", json!("x"))
                .with_config("value", json!(10)),
        )
        .with_node(NodeSpec::new("log", "Log").with_config("message", json!("{{ x }}")))
        .with_node(NodeSpec::new("end", "End"))
        .with_connection(Connection::new("start", "exec_out", "set", "exec_in"))
        .with_connection(Connection::new("set", "exec_out", "log", "exec_in"))
        .with_connection(Connection::new("log", "exec_out", "end", "exec_in"))
        .to_json()
        .unwrap()
}

#[tokio::test]
async fn resubmitting_a_finished_job_executes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let runtime = DurableRuntime::new(
        store.clone(),
        Arc::new(NodeRegistry::with_builtins()),
        FakeClock::new(),
    );
    let job = JobId::new("job-idempotent");

    // First submission runs to completion.
    let first = runtime
        .run(RunRequest::new(linear_blob(), job.clone()))
        .await
        .unwrap();
    assert!(first.success);
    assert!(!first.recovered);
    assert_eq!(first.executed_nodes, 4);
    assert_eq!(store.load(&job).unwrap().unwrap().state, RunState::Completed);

    // Second submission with the same blob: no node re-executes.
    let events = RunEvents::new();
    let mut rx = events.subscribe();
    let second = runtime
        .run(RunRequest::new(linear_blob(), job.clone()).with_events(events))
        .await
        .unwrap();

    assert!(second.success);
    assert!(second.recovered, "result comes from the checkpoint");
    assert_eq!(second.state, RunState::Completed);

    let mut replayed_events = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, RunEvent::NodeStarted { .. }));
        replayed_events += 1;
    }
    assert_eq!(replayed_events, 0, "terminal replay emits nothing");
}
