// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame payloads in both directions.

use armada_core::id::CorrelationId;
use armada_core::{Capability, Environment, FailureKind, JobId, NodeId, RobotId, RobotStatus, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// What a robot announces about itself at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    pub max_concurrent_jobs: u32,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Resource gauges piggybacked on heartbeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMetrics {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub active_jobs: u32,
}

/// Everything a robot needs to execute a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAssignment {
    pub job_id: JobId,
    pub workflow: Value,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// One forwarded robot log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: String,
    pub message: String,
    pub at_ms: u64,
}

/// Robot → orchestrator frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RobotFrame {
    #[serde(rename = "register")]
    Register {
        spec: RobotSpec,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Set on reconnect so the registry entry survives.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        robot_id: Option<RobotId>,
    },

    #[serde(rename = "heartbeat")]
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<HeartbeatMetrics>,
    },

    #[serde(rename = "disconnect")]
    Disconnect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "job:accept")]
    JobAccept { job_id: JobId },

    #[serde(rename = "job:reject")]
    JobReject { job_id: JobId, reason: String },

    #[serde(rename = "job:progress")]
    JobProgress {
        job_id: JobId,
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },

    #[serde(rename = "job:complete")]
    JobComplete {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    #[serde(rename = "job:failed")]
    JobFailed { job_id: JobId, error: String, kind: FailureKind },

    #[serde(rename = "job:cancelled")]
    JobCancelled { job_id: JobId },

    #[serde(rename = "status:response")]
    StatusResponse { status: RobotStatus, active_jobs: Vec<JobId> },

    #[serde(rename = "log:entry")]
    LogEntry { entry: LogRecord },

    #[serde(rename = "log:batch")]
    LogBatch { entries: Vec<LogRecord> },
}

/// Orchestrator → robot frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FleetFrame {
    #[serde(rename = "register:ack")]
    RegisterAck {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        robot_id: Option<RobotId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "heartbeat:ack")]
    HeartbeatAck,

    #[serde(rename = "job:assign")]
    JobAssign { job: JobAssignment },

    #[serde(rename = "job:cancel")]
    JobCancel { job_id: JobId },

    #[serde(rename = "status:request")]
    StatusRequest,

    #[serde(rename = "error")]
    Error { message: String },
}

/// Robot → orchestrator envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotEnvelope {
    /// Unique message id.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(flatten)]
    pub payload: RobotFrame,
}

impl RobotEnvelope {
    pub fn new(payload: RobotFrame) -> Self {
        Self { id: nanoid::nanoid!(12), correlation_id: None, payload }
    }

    pub fn correlated(payload: RobotFrame, correlation_id: CorrelationId) -> Self {
        Self { id: nanoid::nanoid!(12), correlation_id: Some(correlation_id), payload }
    }
}

/// Orchestrator → robot envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetEnvelope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(flatten)]
    pub payload: FleetFrame,
}

impl FleetEnvelope {
    pub fn new(payload: FleetFrame) -> Self {
        Self { id: nanoid::nanoid!(12), correlation_id: None, payload }
    }

    pub fn correlated(payload: FleetFrame, correlation_id: CorrelationId) -> Self {
        Self { id: nanoid::nanoid!(12), correlation_id: Some(correlation_id), payload }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
