// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn spec() -> RobotSpec {
    RobotSpec {
        name: "worker-1".to_string(),
        environment: Environment::Staging,
        max_concurrent_jobs: 3,
        capabilities: [Capability::Browser].into(),
        tags: vec!["eu".to_string()],
    }
}

#[test]
fn register_frame_serializes_with_type_tag() {
    let envelope = RobotEnvelope::new(RobotFrame::Register {
        spec: spec(),
        token: Some("secret".to_string()),
        robot_id: None,
    });
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["type"], "register");
    assert_eq!(value["spec"]["name"], "worker-1");
    assert!(value.get("correlation_id").is_none());
}

#[test]
fn correlated_envelope_round_trips() {
    let corr = CorrelationId::generate();
    let envelope = FleetEnvelope::correlated(
        FleetFrame::JobAssign {
            job: JobAssignment {
                job_id: JobId::new("job-1"),
                workflow: json!({"nodes": {}}),
                inputs: [("k".to_string(), json!(1))].into(),
                priority: 80,
                timeout_secs: Some(600),
            },
        },
        corr.clone(),
    );

    let encoded = serde_json::to_string(&envelope).unwrap();
    let decoded: FleetEnvelope = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, envelope);
    assert_eq!(decoded.correlation_id, Some(corr));
}

#[yare::parameterized(
    heartbeat = { RobotFrame::Heartbeat { metrics: Some(HeartbeatMetrics { cpu_percent: 10.0, memory_percent: 40.0, active_jobs: 1 }) } },
    accept = { RobotFrame::JobAccept { job_id: JobId::new("j") } },
    reject = { RobotFrame::JobReject { job_id: JobId::new("j"), reason: "full".to_string() } },
    progress = { RobotFrame::JobProgress { job_id: JobId::new("j"), progress: 40, node_id: Some(NodeId::new("n")) } },
    complete = { RobotFrame::JobComplete { job_id: JobId::new("j"), result: Some(json!({"x": 1})) } },
    failed = { RobotFrame::JobFailed { job_id: JobId::new("j"), error: "boom".to_string(), kind: FailureKind::Runtime } },
    cancelled = { RobotFrame::JobCancelled { job_id: JobId::new("j") } },
    status = { RobotFrame::StatusResponse { status: RobotStatus::Busy, active_jobs: vec![JobId::new("j")] } },
    log_entry = { RobotFrame::LogEntry { entry: LogRecord { level: "info".to_string(), message: "hi".to_string(), at_ms: 1 } } },
    log_batch = { RobotFrame::LogBatch { entries: vec![] } },
    disconnect = { RobotFrame::Disconnect { reason: None } },
)]
fn robot_frames_round_trip(frame: RobotFrame) {
    let envelope = RobotEnvelope::new(frame);
    let text = serde_json::to_string(&envelope).unwrap();
    let back: RobotEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(back, envelope);
}

#[yare::parameterized(
    ack_ok = { FleetFrame::RegisterAck { success: true, robot_id: Some(RobotId::new("rob-1")), message: None } },
    ack_fail = { FleetFrame::RegisterAck { success: false, robot_id: None, message: Some("bad token".to_string()) } },
    heartbeat_ack = { FleetFrame::HeartbeatAck },
    cancel = { FleetFrame::JobCancel { job_id: JobId::new("j") } },
    status_request = { FleetFrame::StatusRequest },
    error = { FleetFrame::Error { message: "nope".to_string() } },
)]
fn fleet_frames_round_trip(frame: FleetFrame) {
    let envelope = FleetEnvelope::new(frame);
    let text = serde_json::to_string(&envelope).unwrap();
    let back: FleetEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(back, envelope);
}

#[test]
fn envelope_ids_are_unique() {
    let a = RobotEnvelope::new(RobotFrame::Heartbeat { metrics: None });
    let b = RobotEnvelope::new(RobotFrame::Heartbeat { metrics: None });
    assert_ne!(a.id, b.id);
}
