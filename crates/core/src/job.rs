// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.

use crate::robot::RobotId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Generated for scheduler-fired jobs; caller-chosen (and validated)
    /// for jobs submitted through the API.
    pub struct JobId("job-");
}

/// Lifecycle status of a job.
///
/// Transitions: `Pending → Claimed → Running → {Completed | Failed |
/// Cancelled}`, with `Retrying` as the intermediate state when a dispatch
/// attempt is being re-queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Claimed,
    Running,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Check if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Check if the job is waiting for dispatch.
    pub fn is_queued(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Retrying)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Claimed => "claimed",
        Running => "running",
        Retrying => "retrying",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Dispatch priority, clamped to `0..=100`. Higher dispatches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPriority(u8);

impl JobPriority {
    pub const MIN: JobPriority = JobPriority(0);
    pub const NORMAL: JobPriority = JobPriority(50);
    pub const MAX: JobPriority = JobPriority(100);

    /// Create a priority, clamping out-of-range values.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// An orchestrator-level work item: a workflow blob plus inputs plus
/// lifecycle bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Serialized workflow graph, shipped verbatim to the robot.
    pub workflow: Value,
    /// Content hash of the workflow blob (hex sha256).
    pub blob_hash: String,
    pub inputs: HashMap<String, Value>,
    pub priority: JobPriority,
    pub created_at_ms: u64,
    pub status: JobStatus,
    /// Dispatch attempts so far (incremented each time the job is handed
    /// to a robot, including rejected and timed-out attempts).
    #[serde(default)]
    pub attempts: u32,
    /// Robots that have already been tried for this job. Attempt counting
    /// toward the failure threshold only advances across distinct robots.
    #[serde(default)]
    pub attempted_robots: Vec<RobotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_robot_id: Option<RobotId>,
    /// Latest reported progress percentage.
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a pending job for a workflow blob.
    pub fn new(
        id: JobId,
        workflow: Value,
        blob_hash: impl Into<String>,
        inputs: HashMap<String, Value>,
        priority: JobPriority,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            workflow,
            blob_hash: blob_hash.into(),
            inputs,
            priority,
            created_at_ms,
            status: JobStatus::Pending,
            attempts: 0,
            attempted_robots: Vec::new(),
            assigned_robot_id: None,
            progress: 0,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a dispatch attempt against a robot.
    ///
    /// Returns the number of *distinct* robots tried so far, which is the
    /// count compared against the dispatcher's attempt threshold.
    pub fn record_attempt(&mut self, robot: &RobotId) -> usize {
        self.attempts += 1;
        if !self.attempted_robots.contains(robot) {
            self.attempted_robots.push(robot.clone());
        }
        self.attempted_robots.len()
    }

    /// Drop assignment state when a dispatch fails or the robot disappears.
    pub fn clear_assignment(&mut self) {
        self.assigned_robot_id = None;
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            blob_hash: String = "testhash",
        }
        set {
            id: JobId = JobId::new("job-test"),
            workflow: Value = Value::Null,
            inputs: HashMap<String, Value> = HashMap::new(),
            priority: JobPriority = JobPriority::NORMAL,
            created_at_ms: u64 = 0,
            status: JobStatus = JobStatus::Pending,
            attempts: u32 = 0,
            attempted_robots: Vec<RobotId> = Vec::new(),
            progress: u8 = 0,
        }
        option {
            assigned_robot_id: RobotId = None,
            result: Value = None,
            error: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
