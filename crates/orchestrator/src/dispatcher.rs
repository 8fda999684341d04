// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue and dispatch protocol.
//!
//! Owns the job table and the priority queue of pending work. Dispatch:
//! select a robot, ship `JobAssign`, await the correlated accept/reject,
//! and track the job to a terminal state. Failed dispatches re-queue
//! until the distinct-robot attempt threshold trips.

use crate::error::OrchestratorError;
use crate::events::FleetEvents;
use crate::matcher::{select_robot_for_workflow, MatchError, RobotAssignment};
use crate::registry::RobotRegistry;
use armada_core::{
    Capability, Clock, FailureKind, FleetEvent, Job, JobId, JobPriority, JobStatus, NodeId,
    RobotId, Value,
};
use armada_wire::JobAssignment as WireAssignment;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Robot's answer to a job assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignReply {
    Accepted,
    Rejected(String),
}

/// Transport used to reach an individual robot. The channel server
/// implements this; tests substitute a scripted link.
#[async_trait]
pub trait RobotLink: Send + Sync {
    /// Send `JobAssign` and await the correlated reply within `deadline`.
    async fn assign(
        &self,
        robot: &RobotId,
        assignment: WireAssignment,
        deadline: Duration,
    ) -> Result<AssignReply, OrchestratorError>;

    /// Send `JobCancel` and await confirmation within `deadline`.
    /// `Ok(true)` means the robot confirmed the cancellation.
    async fn cancel(
        &self,
        robot: &RobotId,
        job: &JobId,
        deadline: Duration,
    ) -> Result<bool, OrchestratorError>;
}

#[derive(Clone)]
pub struct DispatchConfig {
    /// A job that has been offered to this many distinct robots without
    /// sticking finalizes as failed.
    pub max_distinct_attempts: usize,
    pub assign_timeout: Duration,
    pub cancel_timeout: Duration,
    /// Grace period before an offline robot's jobs re-queue.
    pub heartbeat_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_distinct_attempts: 3,
            assign_timeout: Duration::from_secs(30),
            cancel_timeout: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(60),
        }
    }
}

/// Heap entry: higher priority first, then submission order.
#[derive(PartialEq, Eq)]
struct QueueEntry {
    priority: JobPriority,
    seq: u64,
    job_id: JobId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Matching context kept per job beyond the core record.
#[derive(Clone, Default)]
struct JobRequirements {
    workflow_name: String,
    capabilities: BTreeSet<Capability>,
}

#[derive(Default)]
struct JobTable {
    jobs: HashMap<JobId, Job>,
    requirements: HashMap<JobId, JobRequirements>,
    pending: BinaryHeap<QueueEntry>,
    seq: u64,
}

impl JobTable {
    fn enqueue(&mut self, job_id: JobId, priority: JobPriority) {
        self.seq += 1;
        self.pending.push(QueueEntry { priority, seq: self.seq, job_id });
    }

    /// Pop the highest-priority job still waiting for dispatch. Entries
    /// whose job moved on (cancelled, completed) are dropped lazily.
    fn pop_queued(&mut self) -> Option<JobId> {
        while let Some(entry) = self.pending.pop() {
            if let Some(job) = self.jobs.get(&entry.job_id) {
                if job.status.is_queued() {
                    return Some(entry.job_id);
                }
            }
        }
        None
    }
}

pub struct Dispatcher<L, C> {
    registry: Arc<RobotRegistry>,
    link: Arc<L>,
    events: FleetEvents,
    config: DispatchConfig,
    clock: C,
    table: Mutex<JobTable>,
    assignments: Mutex<Vec<RobotAssignment>>,
}

impl<L, C> Dispatcher<L, C>
where
    L: RobotLink,
    C: Clock,
{
    pub fn new(
        registry: Arc<RobotRegistry>,
        link: Arc<L>,
        events: FleetEvents,
        config: DispatchConfig,
        clock: C,
    ) -> Self {
        Self {
            registry,
            link,
            events,
            config,
            clock,
            table: Mutex::new(JobTable::default()),
            assignments: Mutex::new(Vec::new()),
        }
    }

    pub fn set_assignments(&self, assignments: Vec<RobotAssignment>) {
        *self.assignments.lock() = assignments;
    }

    /// Accept a job into the queue.
    pub fn submit(
        &self,
        job_id: JobId,
        workflow: Value,
        blob_hash: String,
        inputs: HashMap<String, Value>,
        priority: JobPriority,
        required_capabilities: BTreeSet<Capability>,
    ) -> Result<JobId, OrchestratorError> {
        armada_core::validate_external_id(job_id.as_str())?;

        let workflow_name = workflow
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(job_id.as_str())
            .to_string();

        let mut table = self.table.lock();
        if table.jobs.contains_key(&job_id) {
            return Err(OrchestratorError::InvalidRequest(format!(
                "job '{job_id}' already exists"
            )));
        }

        let job = Job::new(
            job_id.clone(),
            workflow,
            blob_hash,
            inputs,
            priority,
            self.clock.epoch_ms(),
        );
        table.jobs.insert(job_id.clone(), job);
        table.requirements.insert(
            job_id.clone(),
            JobRequirements { workflow_name, capabilities: required_capabilities },
        );
        table.enqueue(job_id.clone(), priority);
        drop(table);

        self.emit_update(&job_id);
        tracing::info!(job = %job_id, "job submitted");
        Ok(job_id)
    }

    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        self.table.lock().jobs.get(id).cloned()
    }

    /// Jobs in stable id order, optionally filtered by status.
    pub fn list_jobs(&self, status: Option<JobStatus>) -> Vec<Job> {
        let table = self.table.lock();
        let mut jobs: Vec<Job> = table
            .jobs
            .values()
            .filter(|j| status.map(|s| j.status == s).unwrap_or(true))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    pub fn queue_depth(&self) -> usize {
        let table = self.table.lock();
        table.jobs.values().filter(|j| j.status.is_queued()).count()
    }

    pub fn running_count(&self) -> usize {
        let table = self.table.lock();
        table
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Claimed | JobStatus::Running))
            .count()
    }

    /// One dispatch pass, bounded by the queue depth at entry so a job
    /// bouncing off a rejecting robot cannot spin the loop.
    pub async fn tick(&self) {
        let budget = self.queue_depth();
        for _ in 0..budget {
            let Some((job_id, robot_id)) = self.match_next() else {
                return;
            };
            self.dispatch(&job_id, &robot_id).await;
        }
    }

    /// Pick the next queued job and a robot for it. Robots the job has
    /// not been offered to yet are preferred, so the distinct-robot
    /// attempt counter can advance. Jobs with no eligible robot right
    /// now go back to the queue untouched.
    fn match_next(&self) -> Option<(JobId, RobotId)> {
        let assignments = self.assignments.lock().clone();
        let mut table = self.table.lock();

        let mut deferred = Vec::new();
        let mut matched = None;

        while let Some(job_id) = table.pop_queued() {
            let reqs = table.requirements.get(&job_id).cloned().unwrap_or_default();
            let attempted = table
                .jobs
                .get(&job_id)
                .map(|j| j.attempted_robots.clone())
                .unwrap_or_default();

            let all = self.registry.list();
            let untried: Vec<_> =
                all.iter().filter(|r| !attempted.contains(&r.id)).cloned().collect();
            let candidates = if untried.is_empty() { all } else { untried };

            match select_robot_for_workflow(
                &reqs.workflow_name,
                &candidates,
                &assignments,
                &reqs.capabilities,
            ) {
                Ok(robot_id) => {
                    matched = Some((job_id, robot_id));
                    break;
                }
                Err(MatchError::NoAvailableRobot | MatchError::RobotNotFound(_)) => {
                    deferred.push(job_id);
                }
            }
        }

        for job_id in deferred {
            let priority = table.jobs.get(&job_id).map(|j| j.priority).unwrap_or_default();
            table.enqueue(job_id, priority);
        }
        matched
    }

    /// Run the assignment protocol against one robot.
    async fn dispatch(&self, job_id: &JobId, robot_id: &RobotId) {
        let assignment = {
            let mut table = self.table.lock();
            let Some(job) = table.jobs.get_mut(job_id) else {
                return;
            };
            job.status = JobStatus::Claimed;
            job.assigned_robot_id = Some(robot_id.clone());
            job.record_attempt(robot_id);
            WireAssignment {
                job_id: job_id.clone(),
                workflow: job.workflow.clone(),
                inputs: job.inputs.clone(),
                priority: job.priority.value(),
                timeout_secs: None,
            }
        };
        self.emit_update(job_id);

        tracing::info!(job = %job_id, robot = %robot_id, "dispatching job");
        let reply = self
            .link
            .assign(robot_id, assignment, self.config.assign_timeout)
            .await;

        match reply {
            Ok(AssignReply::Accepted) => {
                let still_live = {
                    let mut table = self.table.lock();
                    match table.jobs.get_mut(job_id) {
                        // A fast robot can report completion before the
                        // accept is processed; never regress a terminal
                        // status.
                        Some(job) if !job.is_terminal() => {
                            job.status = JobStatus::Running;
                            true
                        }
                        _ => false,
                    }
                };
                if still_live {
                    self.registry.claim_job(robot_id, job_id.clone());
                }
                self.emit_update(job_id);
                tracing::info!(job = %job_id, robot = %robot_id, "job accepted");
            }
            Ok(AssignReply::Rejected(reason)) => {
                tracing::warn!(job = %job_id, robot = %robot_id, reason, "job rejected");
                self.requeue_or_fail(job_id);
            }
            Err(e) => {
                tracing::warn!(job = %job_id, robot = %robot_id, error = %e, "dispatch failed");
                self.requeue_or_fail(job_id);
            }
        }
    }

    /// Put a job back on the queue, or finalize it once the distinct-
    /// robot attempt threshold is exceeded.
    fn requeue_or_fail(&self, job_id: &JobId) {
        let mut table = self.table.lock();
        let Some(job) = table.jobs.get_mut(job_id) else {
            return;
        };
        job.clear_assignment();

        if job.attempted_robots.len() >= self.config.max_distinct_attempts {
            job.status = JobStatus::Failed;
            job.error = Some("no available robot accepted the job".to_string());
            drop(table);
            tracing::warn!(job = %job_id, "job exhausted dispatch attempts");
        } else {
            job.status = JobStatus::Retrying;
            let priority = job.priority;
            table.enqueue(job_id.clone(), priority);
            drop(table);
        }
        self.emit_update(job_id);
    }

    // --- robot-originated frames ---

    pub fn handle_progress(&self, job_id: &JobId, progress: u8, node: Option<NodeId>) {
        {
            let mut table = self.table.lock();
            let Some(job) = table.jobs.get_mut(job_id) else {
                return;
            };
            job.progress = progress.min(100);
        }
        tracing::debug!(job = %job_id, progress, node = ?node, "job progress");
        self.emit_update(job_id);
    }

    pub fn handle_complete(&self, robot_id: &RobotId, job_id: &JobId, result: Option<Value>) {
        {
            let mut table = self.table.lock();
            let Some(job) = table.jobs.get_mut(job_id) else {
                return;
            };
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.result = result;
        }
        self.registry.release_job(robot_id, job_id);
        self.emit_update(job_id);
        tracing::info!(job = %job_id, robot = %robot_id, "job completed");
    }

    pub fn handle_failed(
        &self,
        robot_id: &RobotId,
        job_id: &JobId,
        error: String,
        kind: FailureKind,
    ) {
        self.registry.release_job(robot_id, job_id);

        let retriable = kind.is_retriable();
        let mut table = self.table.lock();
        let Some(job) = table.jobs.get_mut(job_id) else {
            return;
        };
        if retriable && job.attempted_robots.len() < self.config.max_distinct_attempts {
            job.status = JobStatus::Retrying;
            job.clear_assignment();
            job.error = Some(error.clone());
            let priority = job.priority;
            table.enqueue(job_id.clone(), priority);
            drop(table);
            tracing::warn!(job = %job_id, error, kind = %kind, "job failed, re-queued");
        } else {
            job.status = JobStatus::Failed;
            job.error = Some(error.clone());
            drop(table);
            tracing::warn!(job = %job_id, error, kind = %kind, "job failed");
        }
        self.emit_update(job_id);
    }

    pub fn handle_cancelled(&self, robot_id: &RobotId, job_id: &JobId) {
        {
            let mut table = self.table.lock();
            let Some(job) = table.jobs.get_mut(job_id) else {
                return;
            };
            job.status = JobStatus::Cancelled;
        }
        self.registry.release_job(robot_id, job_id);
        self.emit_update(job_id);
        tracing::info!(job = %job_id, "job cancelled by robot");
    }

    /// Re-queue jobs orphaned by an offline robot, preserving their
    /// attempt counters.
    pub fn handle_robot_offline(&self, robot_id: &RobotId, orphaned: Vec<JobId>) {
        for job_id in orphaned {
            let mut table = self.table.lock();
            let Some(job) = table.jobs.get_mut(&job_id) else {
                continue;
            };
            if job.assigned_robot_id.as_ref() != Some(robot_id) || job.is_terminal() {
                continue;
            }
            job.status = JobStatus::Pending;
            job.clear_assignment();
            let priority = job.priority;
            table.enqueue(job_id.clone(), priority);
            drop(table);
            tracing::warn!(job = %job_id, robot = %robot_id, "job re-queued after robot loss");
            self.emit_update(&job_id);
        }
    }

    /// Health sweep: expire stale robots and reassign their jobs.
    pub async fn sweep(&self) {
        let swept = self.registry.sweep_stale(
            self.clock.epoch_ms(),
            self.config.heartbeat_timeout.as_millis() as u64,
        );
        for (robot_id, orphaned) in swept {
            self.events.emit(FleetEvent::RobotStatus {
                robot_id: robot_id.clone(),
                status: armada_core::RobotStatus::Offline,
            });
            self.handle_robot_offline(&robot_id, orphaned);
        }
        self.tick().await;
    }

    /// Cancel a job wherever it currently is.
    pub async fn cancel(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        let (status, robot) = {
            let table = self.table.lock();
            let job = table
                .jobs
                .get(job_id)
                .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))?;
            (job.status, job.assigned_robot_id.clone())
        };

        match status {
            JobStatus::Pending | JobStatus::Retrying => {
                let mut table = self.table.lock();
                if let Some(job) = table.jobs.get_mut(job_id) {
                    job.status = JobStatus::Cancelled;
                }
                drop(table);
                self.emit_update(job_id);
                Ok(())
            }
            JobStatus::Claimed | JobStatus::Running => {
                let robot = robot.ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))?;
                let confirmed = self
                    .link
                    .cancel(&robot, job_id, self.config.cancel_timeout)
                    .await
                    .unwrap_or(false);
                if confirmed {
                    // The robot's JobCancelled frame finalizes the state;
                    // nothing more to do here.
                    return Ok(());
                }
                // Unilateral cancellation after timeout.
                {
                    let mut table = self.table.lock();
                    if let Some(job) = table.jobs.get_mut(job_id) {
                        job.status = JobStatus::Cancelled;
                    }
                }
                self.registry.release_job(&robot, job_id);
                self.emit_update(job_id);
                tracing::warn!(job = %job_id, robot = %robot, "cancelled unilaterally");
                Ok(())
            }
            other => Err(OrchestratorError::InvalidJobState {
                job: job_id.clone(),
                status: other.to_string(),
                action: "cancelled",
            }),
        }
    }

    /// Reset a terminal job for a fresh dispatch cycle.
    pub fn retry(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        let mut table = self.table.lock();
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))?;
        if !job.is_terminal() {
            return Err(OrchestratorError::InvalidJobState {
                job: job_id.clone(),
                status: job.status.to_string(),
                action: "retried",
            });
        }
        job.status = JobStatus::Pending;
        job.error = None;
        job.result = None;
        job.progress = 0;
        job.attempts = 0;
        job.attempted_robots.clear();
        job.clear_assignment();
        let priority = job.priority;
        table.enqueue(job_id.clone(), priority);
        drop(table);
        self.emit_update(job_id);
        Ok(())
    }

    fn emit_update(&self, job_id: &JobId) {
        let table = self.table.lock();
        if let Some(job) = table.jobs.get(job_id) {
            self.events.emit(FleetEvent::JobUpdate {
                job_id: job.id.clone(),
                status: job.status,
                progress: Some(job.progress),
                robot_id: job.assigned_robot_id.clone(),
            });
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
