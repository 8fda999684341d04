// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator error taxonomy.

use armada_core::{IdError, JobId, RobotId, ScheduleId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("robot {0} not found")]
    RobotNotFound(RobotId),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("schedule {0} not found")]
    ScheduleNotFound(ScheduleId),
    #[error("no available robot satisfies the requirements")]
    NoAvailableRobot,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
    #[error("authentication failed")]
    AuthFailed,
    #[error("robot {0} is not connected")]
    NotConnected(RobotId),
    #[error("request to robot timed out")]
    RequestTimeout,
    #[error("channel transport: {0}")]
    Transport(String),
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),
    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),
    #[error("job {job} is {status} and cannot be {action}")]
    InvalidJobState { job: JobId, status: String, action: &'static str },
}
