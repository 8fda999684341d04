// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot record: a worker process that executes jobs for the fleet.

use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

crate::define_id! {
    /// Unique identifier for a robot.
    pub struct RobotId("rob-");
}

/// Connection/health status of a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Online,
    Busy,
    Offline,
    Error,
    Maintenance,
}

crate::simple_display! {
    RobotStatus {
        Online => "online",
        Busy => "busy",
        Offline => "offline",
        Error => "error",
        Maintenance => "maintenance",
    }
}

/// Capability tag advertised by a robot and matched against a job's
/// requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Browser,
    Desktop,
    HighMemory,
    Gpu,
    Secure,
    OnPremise,
}

crate::simple_display! {
    Capability {
        Browser => "browser",
        Desktop => "desktop",
        HighMemory => "high_memory",
        Gpu => "gpu",
        Secure => "secure",
        OnPremise => "on_premise",
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "browser" => Ok(Capability::Browser),
            "desktop" => Ok(Capability::Desktop),
            "high_memory" => Ok(Capability::HighMemory),
            "gpu" => Ok(Capability::Gpu),
            "secure" => Ok(Capability::Secure),
            "on_premise" => Ok(Capability::OnPremise),
            other => Err(format!("unknown capability '{other}'")),
        }
    }
}

/// Deployment environment a robot runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Development,
}

crate::simple_display! {
    Environment {
        Production => "production",
        Staging => "staging",
        Development => "development",
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// A registered robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    pub name: String,
    pub status: RobotStatus,
    pub max_concurrent_jobs: u32,
    /// Jobs currently running on this robot. Ordered set so iteration and
    /// serialization stay deterministic.
    #[serde(default)]
    pub current_job_ids: BTreeSet<JobId>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Epoch milliseconds of the last heartbeat.
    pub last_heartbeat_ms: u64,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Robot {
    /// A robot is available when online with spare job slots.
    pub fn is_available(&self) -> bool {
        self.status == RobotStatus::Online
            && (self.current_job_ids.len() as u32) < self.max_concurrent_jobs
    }

    /// Fraction of job slots in use, in `0.0..=1.0`.
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent_jobs == 0 {
            return 1.0;
        }
        self.current_job_ids.len() as f64 / self.max_concurrent_jobs as f64
    }

    /// Whether the robot advertises every capability in `required`.
    pub fn has_capabilities(&self, required: &BTreeSet<Capability>) -> bool {
        required.iter().all(|c| self.capabilities.contains(c))
    }
}

crate::builder! {
    pub struct RobotBuilder => Robot {
        into {
            name: String = "test-robot",
        }
        set {
            id: RobotId = RobotId::new("rob-test"),
            status: RobotStatus = RobotStatus::Online,
            max_concurrent_jobs: u32 = 3,
            current_job_ids: BTreeSet<JobId> = BTreeSet::new(),
            capabilities: BTreeSet<Capability> = BTreeSet::new(),
            last_heartbeat_ms: u64 = 0,
            environment: Environment = Environment::Production,
            tags: Vec<String> = Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "robot_tests.rs"]
mod tests;
