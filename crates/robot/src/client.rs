// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel client: registration, heartbeats, assignment handling,
//! reconnect with capped exponential backoff.

use crate::config::RobotConfig;
use crate::runner::{JobRunner, ProgressUpdate};
use armada_core::{Clock, RobotId, RobotStatus};
use armada_durable::CheckpointStore;
use armada_wire::{
    decode, encode, FleetEnvelope, FleetFrame, HeartbeatMetrics, RobotEnvelope, RobotFrame,
    RobotSpec,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("orchestrator rejected registration")]
    AuthRejected,
    #[error("connection closed")]
    Closed,
}

#[derive(Clone)]
pub struct ClientConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub spec: RobotSpec,
    pub heartbeat_interval: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
}

impl ClientConfig {
    pub fn from_robot_config(config: &RobotConfig) -> Self {
        Self {
            url: config.orchestrator.url.clone(),
            api_key: config.orchestrator.api_key.clone(),
            spec: RobotSpec {
                name: config.robot.name.clone(),
                environment: config.robot.environment,
                max_concurrent_jobs: config.robot.max_concurrent_jobs,
                capabilities: config.robot.capabilities.clone(),
                tags: config.robot.tags.clone(),
            },
            heartbeat_interval: Duration::from_secs(15),
            reconnect_min: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(60),
        }
    }
}

pub struct RobotClient<S, C> {
    config: ClientConfig,
    runner: Arc<JobRunner<S, C>>,
    /// Assigned on first RegisterAck; presented on reconnect so the
    /// orchestrator can re-attach running jobs.
    robot_id: Mutex<Option<RobotId>>,
    /// Correlation ids of in-flight cancel requests, attached to the
    /// terminal JobCancelled frame so the orchestrator's pending request
    /// resolves.
    cancel_corr: Arc<Mutex<std::collections::HashMap<armada_core::JobId, armada_wire::CorrelationId>>>,
}

impl<S, C> RobotClient<S, C>
where
    S: CheckpointStore + 'static,
    C: Clock,
{
    pub fn new(config: ClientConfig, runner: Arc<JobRunner<S, C>>) -> Self {
        Self {
            config,
            runner,
            robot_id: Mutex::new(None),
            cancel_corr: Arc::new(Mutex::new(std::collections::HashMap::new())),
        }
    }

    pub fn robot_id(&self) -> Option<RobotId> {
        self.robot_id.lock().clone()
    }

    /// Connect-and-serve loop; reconnects with capped exponential
    /// backoff until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut backoff = self.config.reconnect_min;
        loop {
            if shutdown.is_cancelled() {
                return;
            }
            match self.serve_connection(&shutdown).await {
                Ok(()) => return, // clean shutdown
                Err(ClientError::AuthRejected) => {
                    tracing::error!("registration rejected, giving up");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, delay_ms = backoff.as_millis() as u64, "connection lost, reconnecting");
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.cancelled() => return,
            }
            backoff = (backoff * 2).min(self.config.reconnect_max);
        }
    }

    async fn serve_connection(&self, shutdown: &CancellationToken) -> Result<(), ClientError> {
        let (ws, _) = tokio_tungstenite::connect_async(self.config.url.as_str())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let (mut sink, mut reader) = ws.split();
        tracing::info!(url = %self.config.url, "connected to orchestrator");

        // Register (re-presenting our id on reconnect).
        let register = RobotEnvelope::new(RobotFrame::Register {
            spec: self.config.spec.clone(),
            token: self.config.api_key.clone(),
            robot_id: self.robot_id(),
        });
        send(&mut sink, &register).await?;

        let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressUpdate>(64);
        let (out_tx, mut out_rx) = mpsc::channel::<RobotEnvelope>(64);
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                incoming = reader.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let envelope: FleetEnvelope = match decode(&text) {
                                Ok(envelope) => envelope,
                                Err(e) => {
                                    tracing::warn!(error = %e, "malformed orchestrator frame");
                                    continue;
                                }
                            };
                            self.handle_frame(envelope, &progress_tx, &out_tx).await?;
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload))
                                .await
                                .map_err(|e| ClientError::Transport(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(ClientError::Transport(e.to_string())),
                    }
                }
                update = progress_rx.recv() => {
                    if let Some(update) = update {
                        let frame = RobotEnvelope::new(RobotFrame::JobProgress {
                            job_id: update.job_id,
                            progress: update.progress,
                            node_id: update.node_id,
                        });
                        send(&mut sink, &frame).await?;
                    }
                }
                outgoing = out_rx.recv() => {
                    if let Some(envelope) = outgoing {
                        send(&mut sink, &envelope).await?;
                    }
                }
                _ = heartbeat.tick() => {
                    let frame = RobotEnvelope::new(RobotFrame::Heartbeat {
                        metrics: Some(HeartbeatMetrics {
                            cpu_percent: 0.0,
                            memory_percent: 0.0,
                            active_jobs: self.runner.active_count() as u32,
                        }),
                    });
                    send(&mut sink, &frame).await?;
                }
                _ = shutdown.cancelled() => {
                    let bye = RobotEnvelope::new(RobotFrame::Disconnect {
                        reason: Some("shutdown".to_string()),
                    });
                    let _ = send(&mut sink, &bye).await;
                    return Ok(());
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        envelope: FleetEnvelope,
        progress_tx: &mpsc::Sender<ProgressUpdate>,
        out_tx: &mpsc::Sender<RobotEnvelope>,
    ) -> Result<(), ClientError> {
        let correlation = envelope.correlation_id;
        match envelope.payload {
            FleetFrame::RegisterAck { success, robot_id, message } => {
                if !success {
                    tracing::error!(message = ?message, "registration refused");
                    return Err(ClientError::AuthRejected);
                }
                if let Some(id) = robot_id {
                    tracing::info!(robot = %id, "registered");
                    *self.robot_id.lock() = Some(id);
                }
                Ok(())
            }

            FleetFrame::HeartbeatAck => Ok(()),

            FleetFrame::JobAssign { job } => {
                let job_id = job.job_id.clone();
                let capacity = self.config.spec.max_concurrent_jobs as usize;

                let reply = if self.runner.active_count() >= capacity {
                    RobotFrame::JobReject {
                        job_id: job_id.clone(),
                        reason: format!("at capacity ({capacity} jobs)"),
                    }
                } else {
                    RobotFrame::JobAccept { job_id: job_id.clone() }
                };
                let accepted = matches!(reply, RobotFrame::JobAccept { .. });
                let envelope = match correlation {
                    Some(corr) => RobotEnvelope::correlated(reply, corr),
                    None => RobotEnvelope::new(reply),
                };
                out_tx
                    .send(envelope)
                    .await
                    .map_err(|_| ClientError::Closed)?;

                if accepted {
                    tracing::info!(job = %job_id, "assignment accepted");
                    let runner = self.runner.clone();
                    let progress = progress_tx.clone();
                    let results = out_tx.clone();
                    let cancel_corr = self.cancel_corr.clone();
                    tokio::spawn(async move {
                        let frame = match runner.run(job, progress).await {
                            Ok(outcome) if outcome.success => RobotFrame::JobComplete {
                                job_id: job_id.clone(),
                                result: Some(serde_json::json!({
                                    "executed_nodes": outcome.executed_nodes,
                                    "duration_ms": outcome.duration_ms,
                                    "recovered": outcome.recovered,
                                })),
                            },
                            Ok(outcome)
                                if outcome.state == armada_durable::RunState::Cancelled =>
                            {
                                RobotFrame::JobCancelled { job_id: job_id.clone() }
                            }
                            Ok(outcome) => RobotFrame::JobFailed {
                                job_id: job_id.clone(),
                                error: outcome
                                    .error
                                    .unwrap_or_else(|| "execution failed".to_string()),
                                kind: armada_core::FailureKind::Runtime,
                            },
                            Err(e) => RobotFrame::JobFailed {
                                job_id: job_id.clone(),
                                error: e.to_string(),
                                kind: armada_core::FailureKind::Validation,
                            },
                        };
                        // A pending cancel request resolves against the
                        // terminal frame.
                        let envelope = match cancel_corr.lock().remove(&job_id) {
                            Some(corr) => RobotEnvelope::correlated(frame, corr),
                            None => RobotEnvelope::new(frame),
                        };
                        let _ = results.send(envelope).await;
                    });
                }
                Ok(())
            }

            FleetFrame::JobCancel { job_id } => {
                let found = self.runner.cancel(&job_id);
                tracing::info!(job = %job_id, found, "cancel requested");
                if found {
                    // Confirmation flows from the runner task once the
                    // engine winds down, carrying this correlation.
                    if let Some(corr) = correlation {
                        self.cancel_corr.lock().insert(job_id, corr);
                    }
                } else {
                    // Unknown or already-finished job: confirm now.
                    let reply = RobotFrame::JobCancelled { job_id };
                    let envelope = match correlation {
                        Some(corr) => RobotEnvelope::correlated(reply, corr),
                        None => RobotEnvelope::new(reply),
                    };
                    out_tx.send(envelope).await.map_err(|_| ClientError::Closed)?;
                }
                Ok(())
            }

            FleetFrame::StatusRequest => {
                let status = if self.runner.active_count() > 0 {
                    RobotStatus::Busy
                } else {
                    RobotStatus::Online
                };
                let reply = RobotFrame::StatusResponse {
                    status,
                    active_jobs: self.runner.active_jobs(),
                };
                let envelope = match correlation {
                    Some(corr) => RobotEnvelope::correlated(reply, corr),
                    None => RobotEnvelope::new(reply),
                };
                out_tx.send(envelope).await.map_err(|_| ClientError::Closed)
            }

            FleetFrame::Error { message } => {
                tracing::warn!(message, "orchestrator error frame");
                Ok(())
            }
        }
    }
}

async fn send<S>(sink: &mut S, envelope: &RobotEnvelope) -> Result<(), ClientError>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = encode(envelope).map_err(|e| ClientError::Transport(e.to_string()))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))
}
