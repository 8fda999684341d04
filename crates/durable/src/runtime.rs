// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable runtime: validate, checkpoint, execute, resume.

use crate::checkpoint::{Checkpoint, RunState};
use crate::store::{CheckpointStore, StoreError};
use armada_core::{validate_external_id, Clock, IdError, JobId, NodeId, Value};
use armada_engine::{
    CancelSignal, EngineSettings, ExecutionContext, NodeRegistry, RunEvents, RunOutcome,
    WorkflowEngine,
};
use armada_model::{blob_hash, LoadError, Workflow};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default per-job execution timeout.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3_600);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid job id: {0}")]
    InvalidJobId(#[from] IdError),
    #[error("workflow blob rejected: {0}")]
    Blob(#[from] LoadError),
    #[error("workflow validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable execution knobs.
#[derive(Clone)]
pub struct DurableConfig {
    /// Save a checkpoint after this many completed nodes (plus every
    /// terminal transition).
    pub checkpoint_interval: usize,
    pub job_timeout: Duration,
    pub engine: EngineSettings,
    /// Remove the checkpoint after a successful run instead of retaining
    /// it for idempotent replay.
    pub clear_on_success: bool,
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 1,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            engine: EngineSettings::default(),
            clear_on_success: false,
        }
    }
}

/// What a durable run yields.
#[derive(Debug, Clone, PartialEq)]
pub struct DurableOutcome {
    pub success: bool,
    pub state: RunState,
    pub executed_nodes: usize,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// True when the result came from (or through) an existing
    /// checkpoint.
    pub recovered: bool,
}

/// One run request.
pub struct RunRequest {
    pub blob: String,
    pub job_id: JobId,
    pub initial_variables: HashMap<String, Value>,
    /// Shared cancel signal; the caller keeps a clone to cancel the run.
    pub cancel: Option<CancelSignal>,
    /// Observer for run events (progress forwarding).
    pub events: Option<RunEvents>,
}

impl RunRequest {
    pub fn new(blob: impl Into<String>, job_id: JobId) -> Self {
        Self {
            blob: blob.into(),
            job_id,
            initial_variables: HashMap::new(),
            cancel: None,
            events: None,
        }
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.initial_variables = variables;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_events(mut self, events: RunEvents) -> Self {
        self.events = Some(events);
        self
    }
}

/// Checkpointed workflow execution against a store.
pub struct DurableRuntime<S, C> {
    store: Arc<S>,
    registry: Arc<NodeRegistry>,
    config: DurableConfig,
    clock: C,
}

impl<S, C> DurableRuntime<S, C>
where
    S: CheckpointStore + 'static,
    C: Clock,
{
    pub fn new(store: Arc<S>, registry: Arc<NodeRegistry>, clock: C) -> Self {
        Self { store, registry, config: DurableConfig::default(), clock }
    }

    pub fn with_config(mut self, config: DurableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Remove a retained checkpoint (after success, or operator cleanup).
    pub fn clear_checkpoint(&self, job_id: &JobId) -> Result<bool, RuntimeError> {
        Ok(self.store.delete(job_id)?)
    }

    /// Execute a workflow blob durably.
    ///
    /// Terminal checkpoints replay without re-executing; a `running` or
    /// `pending` checkpoint resumes, skipping completed nodes.
    pub async fn run(&self, request: RunRequest) -> Result<DurableOutcome, RuntimeError> {
        validate_external_id(request.job_id.as_str())?;
        let started = self.clock.now();

        // Structural validation happens before any side effects.
        let workflow = Workflow::from_json(&request.blob)?;
        let issues = workflow.validate(&*self.registry);
        if !issues.is_empty() {
            let rendered: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            return Err(RuntimeError::Validation(rendered.join("; ")));
        }
        let hash = blob_hash(&request.blob);

        let mut recovered = false;
        let mut initial_variables = request.initial_variables;
        let mut replay = HashMap::new();

        let checkpoint = match self.store.load(&request.job_id)? {
            Some(existing) if existing.is_terminal() => {
                tracing::info!(
                    job = %request.job_id.short(12),
                    state = %existing.state,
                    "terminal checkpoint replayed idempotently"
                );
                return Ok(DurableOutcome {
                    success: existing.state == RunState::Completed,
                    state: existing.state,
                    executed_nodes: existing.executed_nodes.len(),
                    duration_ms: 0,
                    error: existing.error,
                    recovered: true,
                });
            }
            Some(mut existing) => {
                tracing::info!(
                    job = %request.job_id.short(12),
                    completed = existing.executed_nodes.len(),
                    "resuming from checkpoint"
                );
                if existing.blob_hash != hash {
                    tracing::warn!(
                        job = %request.job_id.short(12),
                        "workflow blob changed since the checkpoint was written"
                    );
                }
                recovered = true;
                initial_variables = existing.variables.clone();
                replay = existing.step_results.clone();
                existing.state = RunState::Running;
                existing.updated_at_ms = self.clock.epoch_ms();
                self.store.save(&existing)?;
                existing
            }
            None => {
                let mut fresh =
                    Checkpoint::new(request.job_id.clone(), hash.clone(), self.clock.epoch_ms());
                fresh.variables = initial_variables.clone();
                fresh.state = RunState::Running;
                self.store.save(&fresh)?;
                fresh
            }
        };

        // The step hook owns checkpoint mutation during the run.
        let shared = Arc::new(Mutex::new(checkpoint));
        let store = self.store.clone();
        let interval = self.config.checkpoint_interval.max(1);
        let clock = self.clock.clone();
        let hook_state = shared.clone();
        let unsaved = Arc::new(Mutex::new(0usize));
        let hook_unsaved = unsaved.clone();
        let job_for_hook = request.job_id.clone();

        let mut engine = WorkflowEngine::new(Arc::new(workflow), self.registry.clone())
            .with_settings(self.config.engine.clone())
            .with_replay(replay)
            .with_step_hook(Box::new(move |record| {
                let mut cp = hook_state.lock();
                cp.executed_nodes = record.executed_nodes.to_vec();
                cp.variables = record.variables.clone();
                cp.step_results.insert(record.node_id.clone(), record.step.clone());
                cp.updated_at_ms = clock.epoch_ms();

                let mut pending = hook_unsaved.lock();
                *pending += 1;
                if *pending >= interval {
                    *pending = 0;
                    if let Err(e) = store.save(&cp) {
                        tracing::warn!(
                            job = %job_for_hook.short(12),
                            error = %e,
                            "mid-run checkpoint save failed"
                        );
                    }
                }
            }));
        if let Some(events) = request.events {
            engine = engine.with_events(events);
        }

        let mut ctx = ExecutionContext::with_variables(initial_variables);
        if let Some(cancel) = request.cancel {
            ctx.cancel = cancel;
        }

        let outcome = match tokio::time::timeout(self.config.job_timeout, engine.run(&mut ctx))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                let executed: Vec<NodeId> = shared.lock().executed_nodes.clone();
                RunOutcome::Failed {
                    error: armada_core::RunError::new(
                        None,
                        format!("job timed out after {}s", self.config.job_timeout.as_secs()),
                        armada_core::FailureKind::Timeout,
                        self.clock.epoch_ms(),
                    ),
                    executed_nodes: executed,
                }
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let mut final_cp = shared.lock().clone();
        final_cp.updated_at_ms = self.clock.epoch_ms();

        let result = match outcome {
            RunOutcome::Completed { executed_nodes, variables } => {
                final_cp.state = RunState::Completed;
                final_cp.executed_nodes = executed_nodes;
                final_cp.variables = variables;
                final_cp.error = None;
                DurableOutcome {
                    success: true,
                    state: RunState::Completed,
                    executed_nodes: final_cp.executed_nodes.len(),
                    duration_ms,
                    error: None,
                    recovered,
                }
            }
            RunOutcome::Failed { error, executed_nodes } => {
                final_cp.state = RunState::Failed;
                final_cp.executed_nodes = executed_nodes;
                final_cp.error = Some(error.to_string());
                DurableOutcome {
                    success: false,
                    state: RunState::Failed,
                    executed_nodes: final_cp.executed_nodes.len(),
                    duration_ms,
                    error: final_cp.error.clone(),
                    recovered,
                }
            }
            RunOutcome::Cancelled { executed_nodes } => {
                final_cp.state = RunState::Cancelled;
                final_cp.executed_nodes = executed_nodes;
                final_cp.error = Some("cancelled".to_string());
                DurableOutcome {
                    success: false,
                    state: RunState::Cancelled,
                    executed_nodes: final_cp.executed_nodes.len(),
                    duration_ms,
                    error: final_cp.error.clone(),
                    recovered,
                }
            }
            RunOutcome::Stopped { reason, executed_nodes } => {
                final_cp.state = RunState::Failed;
                final_cp.executed_nodes = executed_nodes;
                final_cp.error = Some(format!("stopped: {reason}"));
                DurableOutcome {
                    success: false,
                    state: RunState::Failed,
                    executed_nodes: final_cp.executed_nodes.len(),
                    duration_ms,
                    error: final_cp.error.clone(),
                    recovered,
                }
            }
        };

        self.store.save(&final_cp)?;
        if result.success && self.config.clear_on_success {
            let _ = self.store.delete(&request.job_id)?;
        }

        tracing::info!(
            job = %request.job_id.short(12),
            state = %result.state,
            executed = result.executed_nodes,
            duration_ms = result.duration_ms,
            "durable run finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
