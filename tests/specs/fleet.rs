// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher reassignment scenario: a robot lost mid-dispatch hands its
//! job to the next robot.

use armada_core::{Clock, FakeClock, JobId, JobStatus, Robot, RobotId};
use armada_orchestrator::{DispatchConfig, Orchestrator, OrchestratorConfig};
use armada_wire::{FleetFrame, RobotFrame};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(clock: FakeClock) -> Arc<Orchestrator<FakeClock>> {
    let config = OrchestratorConfig {
        log_dir: std::env::temp_dir().join("armada-fleet-specs"),
        dispatch: DispatchConfig {
            assign_timeout: Duration::from_millis(100),
            ..DispatchConfig::default()
        },
        ..OrchestratorConfig::default()
    };
    Arc::new(Orchestrator::with_clock(config, clock))
}

fn online_robot(orch: &Orchestrator<FakeClock>, id: &str, heartbeat_ms: u64) {
    let robot = Robot::builder()
        .id(RobotId::new(id))
        .name(id)
        .last_heartbeat_ms(heartbeat_ms)
        .build();
    orch.register_robot(robot);
}

/// Attach a loopback connection that accepts every assignment and
/// immediately reports completion.
fn attach_accepting_robot(orch: &Arc<Orchestrator<FakeClock>>, id: &str) {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    orch.connections().attach(RobotId::new(id), tx);

    let orch = orch.clone();
    let robot = RobotId::new(id);
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            if let FleetFrame::JobAssign { job } = envelope.payload {
                if let Some(corr) = envelope.correlation_id.clone() {
                    orch.connections()
                        .resolve(&corr, RobotFrame::JobAccept { job_id: job.job_id.clone() });
                }
                // Let the accept land before reporting completion.
                tokio::time::sleep(Duration::from_millis(20)).await;
                orch.dispatcher().handle_complete(&robot, &job.job_id, Some(json!("done")));
            }
        }
    });
}

#[tokio::test]
async fn job_reassigns_from_lost_robot_to_the_next() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let orch = orchestrator(clock.clone());

    // Robot A is registered and connected but never answers assignments.
    online_robot(&orch, "rob-a", clock.epoch_ms());
    let (a_tx, mut a_rx) = tokio::sync::mpsc::channel(16);
    orch.connections().attach(RobotId::new("rob-a"), a_tx);
    tokio::spawn(async move { while a_rx.recv().await.is_some() {} });

    // Robot B answers and completes.
    online_robot(&orch, "rob-b", clock.epoch_ms());
    attach_accepting_robot(&orch, "rob-b");

    // Submit: A is selected first (stable id order) and times out.
    let job_id = orch
        .submit_job_with(
            JobId::new("job-reassign"),
            json!({"metadata": {"name": "wf"}, "nodes": {}}),
            HashMap::new(),
            50,
            Default::default(),
        )
        .await
        .unwrap();

    let after_first = orch.get_job(&job_id).unwrap();
    assert_eq!(after_first.status, JobStatus::Retrying, "A timed out, job back in queue");
    assert_eq!(after_first.attempts, 1);

    // A's heartbeat goes stale; the sweep marks it offline and the next
    // pass dispatches to B.
    clock.advance(Duration::from_secs(120));
    orch.registry().heartbeat(&RobotId::new("rob-b"), clock.epoch_ms());
    orch.dispatcher().sweep().await;

    // Give the loopback robot a moment to confirm and complete.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let job = orch.get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 2);
    assert_eq!(
        orch.registry().get(&RobotId::new("rob-a")).unwrap().status,
        armada_core::RobotStatus::Offline
    );
}
