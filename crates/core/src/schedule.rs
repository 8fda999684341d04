// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule record: a rule that produces jobs over time.

use crate::id::ScheduleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Frequency {
    /// Fire a single time at `next_run`.
    Once,
    /// Fire every `interval_secs` from the next-run anchor.
    Interval { interval_secs: u64 },
    /// Fire per a 5- or 6-field cron expression.
    Cron,
}

impl Frequency {
    /// Named interval sugar accepted by the API: `hourly`, `daily`,
    /// `weekly`, `monthly` (monthly approximated as 30 days).
    pub fn from_shorthand(name: &str) -> Option<Frequency> {
        let secs = match name {
            "hourly" => 3_600,
            "daily" => 86_400,
            "weekly" => 7 * 86_400,
            "monthly" => 30 * 86_400,
            _ => return None,
        };
        Some(Frequency::Interval { interval_secs: secs })
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            Frequency::Interval { interval_secs } => Some(Duration::from_secs(*interval_secs)),
            _ => None,
        }
    }
}

/// A schedule entry maintained by the schedule manager.
///
/// `next_run` is always a UTC instant; `timezone` records the IANA name the
/// schedule was created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    /// Workflow the schedule fires; resolved by the `on_fire` callback.
    pub workflow_id: String,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    pub enabled: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Schedule {
    pub fn new(id: ScheduleId, workflow_id: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            id,
            workflow_id: workflow_id.into(),
            frequency,
            cron_expression: None,
            next_run: None,
            enabled: true,
            timezone: default_timezone(),
        }
    }

    /// Whether this schedule is due at instant `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.map(|at| at <= now).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
