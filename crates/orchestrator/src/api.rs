// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator facade: request/response API over the registry,
//! dispatcher, schedule manager, and event stream. Transport adapters
//! (HTTP, CLI) call these methods; the core stays transport-free.

use crate::activity::ActivityLogger;
use crate::auth::{ApiKeyRecord, AuthConfig};
use crate::channel::{ChannelConfig, ChannelServer, ConnectionManager};
use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::error::OrchestratorError;
use crate::events::FleetEvents;
use crate::registry::RobotRegistry;
use crate::schedule::{ScheduleManager, ScheduleSpec};
use armada_core::{
    Capability, Clock, FleetEvent, Job, JobId, JobPriority, JobStatus, Robot, RobotId,
    RobotStatus, Schedule, ScheduleId, SystemClock, Value,
};
use armada_model::blob_hash;
use armada_wire::HeartbeatMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Top-level orchestrator configuration.
#[derive(Clone)]
pub struct OrchestratorConfig {
    pub bind_addr: String,
    pub auth_token: Option<String>,
    pub log_dir: PathBuf,
    pub health_check_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub schedule_poll_interval: Duration,
    pub dispatch: DispatchConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
            auth_token: None,
            log_dir: PathBuf::from("logs"),
            health_check_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(60),
            schedule_poll_interval: Duration::from_secs(1),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Point-in-time fleet counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetMetrics {
    pub robots_total: usize,
    pub robots_online: usize,
    pub jobs_pending: usize,
    pub jobs_running: usize,
}

/// Fields a robot patch may update.
#[derive(Debug, Clone, Default)]
pub struct RobotPatch {
    pub name: Option<String>,
    pub status: Option<RobotStatus>,
    pub max_concurrent_jobs: Option<u32>,
    pub capabilities: Option<BTreeSet<Capability>>,
    pub tags: Option<Vec<String>>,
}

pub struct Orchestrator<C: Clock = SystemClock> {
    config: OrchestratorConfig,
    clock: C,
    registry: Arc<RobotRegistry>,
    manager: Arc<ConnectionManager>,
    dispatcher: Arc<Dispatcher<ConnectionManager, C>>,
    schedules: Arc<ScheduleManager<C>>,
    events: FleetEvents,
    auth: Arc<AuthConfig>,
    activity: Arc<ActivityLogger>,
    /// Workflow library schedules resolve against: name -> blob.
    workflows: Mutex<HashMap<String, Value>>,
}

impl Orchestrator<SystemClock> {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn with_clock(config: OrchestratorConfig, clock: C) -> Self {
        let registry = Arc::new(RobotRegistry::new());
        let manager = Arc::new(ConnectionManager::new());
        let events = FleetEvents::new();
        let auth = Arc::new(match &config.auth_token {
            Some(token) => AuthConfig::with_token(token.clone()),
            None => AuthConfig::open(),
        });
        let mut dispatch = config.dispatch.clone();
        dispatch.heartbeat_timeout = config.heartbeat_timeout;
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            manager.clone(),
            events.clone(),
            dispatch,
            clock.clone(),
        ));
        let schedules = Arc::new(ScheduleManager::new(clock.clone()));
        let activity = Arc::new(ActivityLogger::new(config.log_dir.clone()));

        Self {
            config,
            clock,
            registry,
            manager,
            dispatcher,
            schedules,
            events,
            auth,
            activity,
            workflows: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<RobotRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<ConnectionManager, C>> {
        &self.dispatcher
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Spawn the channel server plus the health and schedule loops.
    /// Everything winds down when the returned token is cancelled.
    pub fn start(self: Arc<Self>) -> CancellationToken {
        let shutdown = CancellationToken::new();

        let server = Arc::new(ChannelServer::new(
            ChannelConfig { bind_addr: self.config.bind_addr.clone(), ..ChannelConfig::default() },
            self.manager.clone(),
            self.registry.clone(),
            self.dispatcher.clone(),
            self.events.clone(),
            self.auth.clone(),
            self.activity.clone(),
            self.clock.clone(),
        ));
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = server.run(server_shutdown).await {
                tracing::error!(error = %e, "channel server exited");
            }
        });

        let health = self.clone();
        let health_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(health.config.health_check_interval);
            loop {
                tokio::select! {
                    _ = timer.tick() => health.dispatcher.sweep().await,
                    _ = health_shutdown.cancelled() => return,
                }
            }
        });

        let scheduler = self.clone();
        let scheduler_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(scheduler.config.schedule_poll_interval);
            loop {
                tokio::select! {
                    _ = timer.tick() => scheduler.fire_due_schedules().await,
                    _ = scheduler_shutdown.cancelled() => return,
                }
            }
        });

        shutdown
    }

    // --- robots ---

    pub fn list_robots(&self, status: Option<RobotStatus>) -> Vec<Robot> {
        self.registry
            .list()
            .into_iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .collect()
    }

    pub fn get_robot(&self, id: &RobotId) -> Result<Robot, OrchestratorError> {
        self.registry
            .get(id)
            .ok_or_else(|| OrchestratorError::RobotNotFound(id.clone()))
    }

    /// API-side registration (robots normally register over the channel).
    pub fn register_robot(&self, robot: Robot) -> Robot {
        self.registry.register(robot.clone());
        self.events.emit(FleetEvent::RobotStatus {
            robot_id: robot.id.clone(),
            status: robot.status,
        });
        robot
    }

    pub fn update_robot(&self, id: &RobotId, patch: RobotPatch) -> Result<Robot, OrchestratorError> {
        let mut robot = self.get_robot(id)?;
        if let Some(name) = patch.name {
            robot.name = name;
        }
        if let Some(status) = patch.status {
            robot.status = status;
        }
        if let Some(max) = patch.max_concurrent_jobs {
            robot.max_concurrent_jobs = max;
        }
        if let Some(caps) = patch.capabilities {
            robot.capabilities = caps;
        }
        if let Some(tags) = patch.tags {
            robot.tags = tags;
        }
        self.registry.register(robot.clone());
        self.events.emit(FleetEvent::RobotStatus {
            robot_id: robot.id.clone(),
            status: robot.status,
        });
        Ok(robot)
    }

    pub fn delete_robot(&self, id: &RobotId) -> Result<(), OrchestratorError> {
        self.registry
            .deregister(id)
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::RobotNotFound(id.clone()))
    }

    pub fn send_heartbeat(
        &self,
        id: &RobotId,
        metrics: Option<HeartbeatMetrics>,
    ) -> Result<(), OrchestratorError> {
        if !self.registry.heartbeat(id, self.clock.epoch_ms()) {
            return Err(OrchestratorError::RobotNotFound(id.clone()));
        }
        if let Some(m) = metrics {
            tracing::trace!(robot = %id, cpu = m.cpu_percent, "api heartbeat metrics");
        }
        Ok(())
    }

    // --- workflows & jobs ---

    /// Register a workflow blob under a name schedules can reference.
    pub fn register_workflow(&self, name: impl Into<String>, blob: Value) {
        self.workflows.lock().insert(name.into(), blob);
    }

    pub async fn submit_job(
        &self,
        workflow: Value,
        inputs: HashMap<String, Value>,
        priority: u8,
    ) -> Result<JobId, OrchestratorError> {
        self.submit_job_with(JobId::generate(), workflow, inputs, priority, BTreeSet::new())
            .await
    }

    pub async fn submit_job_with(
        &self,
        job_id: JobId,
        workflow: Value,
        inputs: HashMap<String, Value>,
        priority: u8,
        required_capabilities: BTreeSet<Capability>,
    ) -> Result<JobId, OrchestratorError> {
        let blob = workflow.to_string();
        let id = self.dispatcher.submit(
            job_id,
            workflow,
            blob_hash(&blob),
            inputs,
            JobPriority::new(priority),
            required_capabilities,
        )?;
        self.activity.append("dispatcher", &format!("submitted job {id}"));
        self.dispatcher.tick().await;
        self.emit_queue_metrics();
        Ok(id)
    }

    pub fn list_jobs(&self, status: Option<JobStatus>) -> Vec<Job> {
        self.dispatcher.list_jobs(status)
    }

    pub fn get_job(&self, id: &JobId) -> Result<Job, OrchestratorError> {
        self.dispatcher
            .get_job(id)
            .ok_or_else(|| OrchestratorError::JobNotFound(id.clone()))
    }

    pub async fn cancel_job(&self, id: &JobId) -> Result<(), OrchestratorError> {
        self.dispatcher.cancel(id).await
    }

    pub async fn retry_job(&self, id: &JobId) -> Result<(), OrchestratorError> {
        self.dispatcher.retry(id)?;
        self.dispatcher.tick().await;
        Ok(())
    }

    // --- schedules ---

    pub fn list_schedules(&self) -> Vec<Schedule> {
        self.schedules.list()
    }

    pub fn create_schedule(&self, spec: ScheduleSpec) -> Result<Schedule, OrchestratorError> {
        self.schedules.create(spec)
    }

    pub fn update_schedule(
        &self,
        id: &ScheduleId,
        spec: ScheduleSpec,
    ) -> Result<Schedule, OrchestratorError> {
        self.schedules.update(id, spec)
    }

    pub fn delete_schedule(&self, id: &ScheduleId) -> Result<(), OrchestratorError> {
        self.schedules.delete(id).map(|_| ())
    }

    pub fn enable_schedule(&self, id: &ScheduleId) -> Result<(), OrchestratorError> {
        self.schedules.set_enabled(id, true)
    }

    pub fn disable_schedule(&self, id: &ScheduleId) -> Result<(), OrchestratorError> {
        self.schedules.set_enabled(id, false)
    }

    /// Fire one schedule immediately.
    pub async fn run_now(&self, id: &ScheduleId) -> Result<JobId, OrchestratorError> {
        let schedule = self
            .schedules
            .get(id)
            .ok_or_else(|| OrchestratorError::ScheduleNotFound(id.clone()))?;
        let job_id = self
            .fire_schedule(&schedule)
            .ok_or_else(|| {
                OrchestratorError::InvalidRequest(format!(
                    "schedule {id} references unknown workflow '{}'",
                    schedule.workflow_id
                ))
            })?;
        self.events.emit(FleetEvent::ScheduleFired {
            schedule_id: id.clone(),
            job_id: job_id.clone(),
        });
        self.dispatcher.tick().await;
        Ok(job_id)
    }

    /// Scheduler loop body: fire everything due, then dispatch.
    pub async fn fire_due_schedules(&self) {
        let fired = {
            let mut on_fire = |schedule: &Schedule| self.fire_schedule(schedule);
            self.schedules.tick(&mut on_fire)
        };
        for (schedule_id, job_id) in &fired {
            self.events.emit(FleetEvent::ScheduleFired {
                schedule_id: schedule_id.clone(),
                job_id: job_id.clone(),
            });
            self.activity
                .append("scheduler", &format!("fired {schedule_id} -> {job_id}"));
        }
        if !fired.is_empty() {
            self.dispatcher.tick().await;
        }
    }

    /// Resolve a schedule's workflow and enqueue a job for it.
    fn fire_schedule(&self, schedule: &Schedule) -> Option<JobId> {
        let workflow = self.workflows.lock().get(&schedule.workflow_id).cloned()?;
        let blob = workflow.to_string();
        let job_id = JobId::generate();
        match self.dispatcher.submit(
            job_id,
            workflow,
            blob_hash(&blob),
            HashMap::new(),
            JobPriority::NORMAL,
            BTreeSet::new(),
        ) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(schedule = %schedule.id, error = %e, "schedule fire failed");
                None
            }
        }
    }

    // --- streams & metrics ---

    /// Live event stream (robot status, job updates, queue metrics,
    /// schedule fires).
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }

    pub fn fleet_metrics(&self) -> FleetMetrics {
        let robots = self.registry.list();
        FleetMetrics {
            robots_total: robots.len(),
            robots_online: robots.iter().filter(|r| r.status == RobotStatus::Online).count(),
            jobs_pending: self.dispatcher.queue_depth(),
            jobs_running: self.dispatcher.running_count(),
        }
    }

    fn emit_queue_metrics(&self) {
        let metrics = self.fleet_metrics();
        self.events.emit(FleetEvent::QueueMetrics {
            pending: metrics.jobs_pending,
            running: metrics.jobs_running,
            robots_online: metrics.robots_online,
        });
    }

    // --- robot API keys ---

    pub fn create_robot_key(&self, label: impl Into<String>) -> (ApiKeyRecord, String) {
        self.auth.create_key(label, self.clock.epoch_ms())
    }

    pub fn revoke_robot_key(&self, id: &str) -> bool {
        self.auth.revoke_key(id)
    }

    pub fn list_robot_keys(&self) -> Vec<ApiKeyRecord> {
        self.auth.list_keys()
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
