// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule manager: interval, cron, and one-shot schedules.
//!
//! Firing never runs a workflow directly; due schedules are handed to a
//! caller-provided `on_fire` which is expected to enqueue a job through
//! the dispatcher.

use crate::cron::CronSchedule;
use crate::error::OrchestratorError;
use armada_core::{Clock, Frequency, JobId, Schedule, ScheduleId};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Creation/update request for a schedule.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSpec {
    pub workflow_id: String,
    /// `once`, `interval`, `cron`, or a shorthand (`hourly`, `daily`,
    /// `weekly`, `monthly`).
    pub frequency: String,
    pub interval_secs: Option<u64>,
    pub cron_expression: Option<String>,
    /// For one-shot schedules: when to fire.
    pub run_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub enabled: bool,
}

pub struct ScheduleManager<C> {
    schedules: Mutex<HashMap<ScheduleId, Schedule>>,
    clock: C,
}

impl<C: Clock> ScheduleManager<C> {
    pub fn new(clock: C) -> Self {
        Self { schedules: Mutex::new(HashMap::new()), clock }
    }

    pub fn create(&self, spec: ScheduleSpec) -> Result<Schedule, OrchestratorError> {
        let id = ScheduleId::generate();
        let schedule = self.build(id, spec)?;
        self.schedules.lock().insert(schedule.id.clone(), schedule.clone());
        tracing::info!(schedule = %schedule.id, workflow = %schedule.workflow_id, "schedule created");
        Ok(schedule)
    }

    pub fn update(&self, id: &ScheduleId, spec: ScheduleSpec) -> Result<Schedule, OrchestratorError> {
        let mut schedules = self.schedules.lock();
        if !schedules.contains_key(id) {
            return Err(OrchestratorError::ScheduleNotFound(id.clone()));
        }
        drop(schedules);

        let rebuilt = self.build(id.clone(), spec)?;
        self.schedules.lock().insert(id.clone(), rebuilt.clone());
        Ok(rebuilt)
    }

    pub fn delete(&self, id: &ScheduleId) -> Result<Schedule, OrchestratorError> {
        self.schedules
            .lock()
            .remove(id)
            .ok_or_else(|| OrchestratorError::ScheduleNotFound(id.clone()))
    }

    pub fn get(&self, id: &ScheduleId) -> Option<Schedule> {
        self.schedules.lock().get(id).cloned()
    }

    /// All schedules in stable id order.
    pub fn list(&self) -> Vec<Schedule> {
        let mut all: Vec<Schedule> = self.schedules.lock().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn set_enabled(&self, id: &ScheduleId, enabled: bool) -> Result<(), OrchestratorError> {
        let mut schedules = self.schedules.lock();
        let schedule = schedules
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::ScheduleNotFound(id.clone()))?;
        schedule.enabled = enabled;
        if enabled && schedule.next_run.is_none() {
            schedule.next_run = next_fire(schedule, self.clock.utc_now());
        }
        Ok(())
    }

    /// Fire every due schedule through `on_fire` and advance its
    /// `next_run`. Returns `(schedule id, job id)` per fire.
    pub fn tick(
        &self,
        on_fire: &mut dyn FnMut(&Schedule) -> Option<JobId>,
    ) -> Vec<(ScheduleId, JobId)> {
        let now = self.clock.utc_now();
        let due: Vec<Schedule> = self
            .schedules
            .lock()
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect();

        let mut fired = Vec::new();
        for schedule in due {
            let job = on_fire(&schedule);
            let mut schedules = self.schedules.lock();
            let Some(entry) = schedules.get_mut(&schedule.id) else {
                continue;
            };
            match schedule.frequency {
                Frequency::Once => {
                    entry.next_run = None;
                    entry.enabled = false;
                }
                _ => {
                    entry.next_run = next_fire(entry, now);
                }
            }
            drop(schedules);

            match job {
                Some(job_id) => {
                    tracing::info!(
                        schedule = %schedule.id,
                        job = %job_id,
                        "schedule fired"
                    );
                    fired.push((schedule.id.clone(), job_id));
                }
                None => {
                    tracing::warn!(schedule = %schedule.id, "schedule fire produced no job");
                }
            }
        }
        fired
    }

    /// Fire one schedule immediately, regardless of `next_run`.
    pub fn run_now(
        &self,
        id: &ScheduleId,
        on_fire: &mut dyn FnMut(&Schedule) -> Option<JobId>,
    ) -> Result<Option<JobId>, OrchestratorError> {
        let schedule = self.get(id).ok_or_else(|| OrchestratorError::ScheduleNotFound(id.clone()))?;
        Ok(on_fire(&schedule))
    }

    /// The next instant any schedule is due, for scheduler-loop sleeping.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.schedules
            .lock()
            .values()
            .filter(|s| s.enabled)
            .filter_map(|s| s.next_run)
            .min()
    }

    fn build(&self, id: ScheduleId, spec: ScheduleSpec) -> Result<Schedule, OrchestratorError> {
        if spec.workflow_id.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "schedule requires a workflow_id".to_string(),
            ));
        }

        let frequency = match spec.frequency.as_str() {
            "once" => Frequency::Once,
            "interval" => {
                let secs = spec.interval_secs.filter(|s| *s > 0).ok_or_else(|| {
                    OrchestratorError::InvalidRequest(
                        "interval schedules require interval_secs > 0".to_string(),
                    )
                })?;
                Frequency::Interval { interval_secs: secs }
            }
            "cron" => Frequency::Cron,
            shorthand => Frequency::from_shorthand(shorthand).ok_or_else(|| {
                OrchestratorError::InvalidRequest(format!("unknown frequency '{shorthand}'"))
            })?,
        };

        let mut schedule = Schedule::new(id, spec.workflow_id, frequency);
        schedule.enabled = spec.enabled;

        if let Some(tz) = spec.timezone {
            validate_timezone(&tz)?;
            schedule.timezone = tz;
        }

        match &schedule.frequency {
            Frequency::Cron => {
                let expr = spec.cron_expression.ok_or_else(|| {
                    OrchestratorError::InvalidRequest(
                        "cron schedules require a cron_expression".to_string(),
                    )
                })?;
                // Parse now so malformed expressions fail at creation.
                CronSchedule::parse(&expr)?;
                schedule.cron_expression = Some(expr);
            }
            Frequency::Once => {
                schedule.next_run = spec.run_at;
                if schedule.next_run.is_none() {
                    return Err(OrchestratorError::InvalidRequest(
                        "one-shot schedules require run_at".to_string(),
                    ));
                }
            }
            Frequency::Interval { .. } => {}
        }

        if schedule.next_run.is_none() {
            schedule.next_run = next_fire(&schedule, self.clock.utc_now());
        }
        Ok(schedule)
    }
}

/// Compute a schedule's next fire instant strictly after `now` (UTC).
pub fn next_fire(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match &schedule.frequency {
        Frequency::Once => schedule.next_run.filter(|at| *at > now),
        Frequency::Interval { interval_secs } => {
            let step = ChronoDuration::seconds((*interval_secs).max(1) as i64);
            // Advance from the anchor past `now`, skipping missed fires.
            let mut next = schedule.next_run.unwrap_or(now);
            while next <= now {
                next += step;
            }
            Some(next)
        }
        Frequency::Cron => {
            let expr = schedule.cron_expression.as_deref()?;
            CronSchedule::parse(expr).ok()?.next_fire(now)
        }
    }
}

/// Accept IANA-shaped timezone names ("UTC", "Area/Location"). Fires are
/// computed on UTC instants; the name is retained for display.
fn validate_timezone(tz: &str) -> Result<(), OrchestratorError> {
    let ok = tz == "UTC"
        || (tz.contains('/')
            && tz
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '+' | '-')));
    if ok {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidTimezone(tz.to_string()))
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
