// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution on the robot: one durable run per assignment, with a
//! cancel handle and progress forwarding.

use armada_core::{Clock, JobId, NodeId, RunEvent, SystemClock, Value};
use armada_durable::{CheckpointStore, DurableConfig, DurableOutcome, DurableRuntime, RunRequest, RuntimeError};
use armada_engine::{CancelSignal, NodeRegistry, RunEvents};
use armada_wire::JobAssignment;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Progress sample forwarded to the channel as `JobProgress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    pub progress: u8,
    pub node_id: Option<NodeId>,
}

/// Runs assigned jobs through the durable runtime, tracking cancel
/// handles per in-flight job.
pub struct JobRunner<S, C = SystemClock> {
    runtime: Arc<DurableRuntime<S, C>>,
    active: Mutex<HashMap<JobId, CancelSignal>>,
}

impl<S, C> JobRunner<S, C>
where
    S: CheckpointStore + 'static,
    C: Clock,
{
    pub fn new(store: Arc<S>, registry: Arc<NodeRegistry>, clock: C, config: DurableConfig) -> Self {
        Self {
            runtime: Arc::new(DurableRuntime::new(store, registry, clock).with_config(config)),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut jobs: Vec<JobId> = self.active.lock().keys().cloned().collect();
        jobs.sort();
        jobs
    }

    pub fn is_running(&self, job: &JobId) -> bool {
        self.active.lock().contains_key(job)
    }

    /// Request cooperative cancellation of an in-flight job.
    pub fn cancel(&self, job: &JobId) -> bool {
        match self.active.lock().get(job) {
            Some(signal) => {
                signal.cancel();
                true
            }
            None => false,
        }
    }

    /// Execute one assignment to completion, streaming progress samples
    /// into `progress_tx`.
    pub async fn run(
        &self,
        assignment: JobAssignment,
        progress_tx: mpsc::Sender<ProgressUpdate>,
    ) -> Result<DurableOutcome, RuntimeError> {
        let job_id = assignment.job_id.clone();
        let cancel = CancelSignal::new();
        self.active.lock().insert(job_id.clone(), cancel.clone());

        let events = RunEvents::new();
        let mut event_rx = events.subscribe();
        let forward_job = job_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Ok(event) = event_rx.recv().await {
                let update = match event {
                    RunEvent::NodeCompleted { node_id, progress } => ProgressUpdate {
                        job_id: forward_job.clone(),
                        progress,
                        node_id: Some(node_id),
                    },
                    RunEvent::Progress { percent, node_id } => ProgressUpdate {
                        job_id: forward_job.clone(),
                        progress: percent,
                        node_id,
                    },
                    _ => continue,
                };
                if progress_tx.send(update).await.is_err() {
                    return;
                }
            }
        });

        let blob = assignment.workflow.to_string();
        let initial_variables: HashMap<String, Value> = assignment.inputs;
        let request = RunRequest::new(blob, job_id.clone())
            .with_variables(initial_variables)
            .with_cancel(cancel)
            .with_events(events);

        let result = self.runtime.run(request).await;

        self.active.lock().remove(&job_id);
        forwarder.abort();
        result
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
