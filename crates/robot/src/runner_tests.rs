// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use armada_core::FakeClock;
use armada_durable::MemoryStore;
use armada_model::{Connection, NodeSpec, Workflow};
use serde_json::json;

fn runner() -> JobRunner<MemoryStore, FakeClock> {
    JobRunner::new(
        Arc::new(MemoryStore::new()),
        Arc::new(NodeRegistry::with_builtins()),
        FakeClock::new(),
        DurableConfig::default(),
    )
}

fn assignment(job: &str, workflow: &Workflow) -> JobAssignment {
    JobAssignment {
        job_id: JobId::new(job),
        workflow: serde_json::to_value(workflow).unwrap(),
        inputs: HashMap::new(),
        priority: 50,
        timeout_secs: None,
    }
}

fn linear() -> Workflow {
    Workflow::named("linear")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("set", "SetVariable")
                .with_config("name", json!("x"))
                .with_config("value", json!(1)),
        )
        .with_node(NodeSpec::new("end", "End"))
        .with_connection(Connection::new("start", "exec_out", "set", "exec_in"))
        .with_connection(Connection::new("set", "exec_out", "end", "exec_in"))
}

#[tokio::test]
async fn run_executes_and_streams_progress() {
    let runner = runner();
    let (tx, mut rx) = mpsc::channel(32);

    let outcome = runner.run(assignment("job-1", &linear()), tx).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed_nodes, 3);
    assert_eq!(runner.active_count(), 0);

    let mut samples = Vec::new();
    while let Ok(update) = rx.try_recv() {
        assert_eq!(update.job_id, JobId::new("job-1"));
        samples.push(update.progress);
    }
    assert!(!samples.is_empty());
    assert_eq!(samples.last(), Some(&100));
}

#[tokio::test]
async fn inputs_become_initial_variables() {
    let runner = runner();
    let wf = Workflow::named("echo")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(
            NodeSpec::new("copy", "SetVariable")
                .with_config("name", json!("out"))
                .with_config("value", json!("{{ seed }}")),
        )
        .with_connection(Connection::new("start", "exec_out", "copy", "exec_in"));

    let mut a = assignment("job-2", &wf);
    a.inputs.insert("seed".to_string(), json!(41));

    let (tx, _rx) = mpsc::channel(8);
    let outcome = runner.run(a, tx).await.unwrap();
    assert!(outcome.success);
}

#[tokio::test]
async fn cancel_interrupts_a_running_job() {
    // Cancellation is cooperative: the in-flight node finishes, then the
    // run surfaces Cancelled at the next check.
    let runner = Arc::new(runner());
    let wf = Workflow::named("slow")
        .with_node(NodeSpec::new("start", "Start"))
        .with_node(NodeSpec::new("wait", "Wait").with_config("seconds", json!(1.0)))
        .with_connection(Connection::new("start", "exec_out", "wait", "exec_in"));

    let (tx, _rx) = mpsc::channel(8);
    let task = {
        let runner = runner.clone();
        let a = assignment("job-3", &wf);
        tokio::spawn(async move { runner.run(a, tx).await })
    };

    // Wait for the job to register as active, then cancel it.
    for _ in 0..100 {
        if runner.is_running(&JobId::new("job-3")) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(runner.cancel(&JobId::new("job-3")));

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome.state, armada_durable::RunState::Cancelled);
    assert!(!runner.is_running(&JobId::new("job-3")));
}

#[tokio::test]
async fn cancel_unknown_job_reports_false() {
    let runner = runner();
    assert!(!runner.cancel(&JobId::new("job-ghost")));
}

#[tokio::test]
async fn rerun_of_completed_job_recovers() {
    let runner = runner();
    let (tx, _rx) = mpsc::channel(8);
    runner.run(assignment("job-4", &linear()), tx).await.unwrap();

    let (tx, _rx) = mpsc::channel(8);
    let outcome = runner.run(assignment("job-4", &linear()), tx).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.recovered);
}
