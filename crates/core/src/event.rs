// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types emitted by the engine and the orchestrator.

use crate::failure::FailureKind;
use crate::id::ScheduleId;
use crate::job::{JobId, JobStatus};
use crate::node::NodeId;
use crate::robot::{RobotId, RobotStatus};
use serde::{Deserialize, Serialize};

/// Events emitted by one workflow run.
///
/// Each run owns its emitter; observers subscribe through an explicit
/// handle rather than a process-global bus. Serializes with
/// `{"type": "scope:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    #[serde(rename = "workflow:started")]
    WorkflowStarted {
        total_nodes: usize,
        /// True when the run resumed from an existing checkpoint.
        #[serde(default)]
        recovered: bool,
    },

    #[serde(rename = "node:started")]
    NodeStarted {
        node_id: NodeId,
        node_type: String,
        /// Percent of nodes executed before this node began.
        progress: u8,
    },

    #[serde(rename = "node:completed")]
    NodeCompleted {
        node_id: NodeId,
        progress: u8,
    },

    #[serde(rename = "node:failed")]
    NodeFailed {
        node_id: NodeId,
        message: String,
        kind: FailureKind,
    },

    #[serde(rename = "run:progress")]
    Progress {
        percent: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted {
        executed_nodes: usize,
        duration_ms: u64,
    },

    #[serde(rename = "workflow:failed")]
    WorkflowFailed {
        message: String,
        kind: FailureKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },

    #[serde(rename = "workflow:cancelled")]
    WorkflowCancelled { executed_nodes: usize },

    #[serde(rename = "workflow:paused")]
    WorkflowPaused,

    #[serde(rename = "workflow:resumed")]
    WorkflowResumed,
}

impl RunEvent {
    /// Short summary line for activity logs.
    pub fn log_summary(&self) -> String {
        match self {
            RunEvent::WorkflowStarted { total_nodes, recovered } => {
                if *recovered {
                    format!("started nodes={total_nodes} recovered")
                } else {
                    format!("started nodes={total_nodes}")
                }
            }
            RunEvent::NodeStarted { node_id, node_type, .. } => {
                format!("node started {node_id} ({node_type})")
            }
            RunEvent::NodeCompleted { node_id, progress } => {
                format!("node completed {node_id} ({progress}%)")
            }
            RunEvent::NodeFailed { node_id, message, kind } => {
                format!("node failed {node_id}: {message} ({kind})")
            }
            RunEvent::Progress { percent, .. } => format!("progress {percent}%"),
            RunEvent::WorkflowCompleted { executed_nodes, duration_ms } => {
                format!("completed nodes={executed_nodes} in {duration_ms}ms")
            }
            RunEvent::WorkflowFailed { message, kind, .. } => {
                format!("failed: {message} ({kind})")
            }
            RunEvent::WorkflowCancelled { executed_nodes } => {
                format!("cancelled nodes={executed_nodes}")
            }
            RunEvent::WorkflowPaused => "paused".to_string(),
            RunEvent::WorkflowResumed => "resumed".to_string(),
        }
    }
}

/// Fleet-level events published to orchestrator observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FleetEvent {
    #[serde(rename = "robot:status")]
    RobotStatus { robot_id: RobotId, status: RobotStatus },

    #[serde(rename = "job:update")]
    JobUpdate {
        job_id: JobId,
        status: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        robot_id: Option<RobotId>,
    },

    #[serde(rename = "queue:metrics")]
    QueueMetrics {
        pending: usize,
        running: usize,
        robots_online: usize,
    },

    #[serde(rename = "schedule:fired")]
    ScheduleFired { schedule_id: ScheduleId, job_id: JobId },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
