// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot channel server: a persistent websocket per robot.
//!
//! Each connection runs on its own task. Frames carrying a correlation
//! id that matches a pending request resolve that request; everything
//! else routes to the dispatcher. Liveness is ping/pong on a fixed
//! cadence with a pong deadline.

use crate::activity::ActivityLogger;
use crate::auth::AuthConfig;
use crate::dispatcher::{AssignReply, Dispatcher, RobotLink};
use crate::error::OrchestratorError;
use crate::events::FleetEvents;
use crate::registry::RobotRegistry;
use armada_core::id::CorrelationId;
use armada_core::{Clock, FleetEvent, JobId, Robot, RobotId, RobotStatus};
use armada_wire::{
    decode, encode, FleetEnvelope, FleetFrame, JobAssignment, RobotEnvelope, RobotFrame,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct ChannelConfig {
    pub bind_addr: String,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-robot outgoing senders plus the pending-request correlation map.
#[derive(Default)]
pub struct ConnectionManager {
    senders: Mutex<HashMap<RobotId, mpsc::Sender<FleetEnvelope>>>,
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<RobotFrame>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, robot: RobotId, tx: mpsc::Sender<FleetEnvelope>) {
        self.senders.lock().insert(robot, tx);
    }

    pub fn detach(&self, robot: &RobotId) {
        self.senders.lock().remove(robot);
    }

    pub fn is_connected(&self, robot: &RobotId) -> bool {
        self.senders.lock().contains_key(robot)
    }

    pub fn connected_count(&self) -> usize {
        self.senders.lock().len()
    }

    /// Fire-and-forget send.
    pub async fn send_to(
        &self,
        robot: &RobotId,
        envelope: FleetEnvelope,
    ) -> Result<(), OrchestratorError> {
        let tx = self
            .senders
            .lock()
            .get(robot)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotConnected(robot.clone()))?;
        tx.send(envelope)
            .await
            .map_err(|_| OrchestratorError::NotConnected(robot.clone()))
    }

    /// Send a frame and await its correlated response within `deadline`.
    pub async fn request(
        &self,
        robot: &RobotId,
        frame: FleetFrame,
        deadline: Duration,
    ) -> Result<RobotFrame, OrchestratorError> {
        let correlation = CorrelationId::generate();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(correlation.clone(), tx);

        let envelope = FleetEnvelope::correlated(frame, correlation.clone());
        if let Err(e) = self.send_to(robot, envelope).await {
            self.pending.lock().remove(&correlation);
            return Err(e);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.pending.lock().remove(&correlation);
                Err(OrchestratorError::Transport("connection dropped".to_string()))
            }
            Err(_) => {
                self.pending.lock().remove(&correlation);
                Err(OrchestratorError::RequestTimeout)
            }
        }
    }

    /// Resolve a pending request from an incoming correlated frame.
    /// Returns false when no request was waiting.
    pub fn resolve(&self, correlation: &CorrelationId, frame: RobotFrame) -> bool {
        match self.pending.lock().remove(correlation) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl RobotLink for ConnectionManager {
    async fn assign(
        &self,
        robot: &RobotId,
        assignment: JobAssignment,
        deadline: Duration,
    ) -> Result<AssignReply, OrchestratorError> {
        let reply = self
            .request(robot, FleetFrame::JobAssign { job: assignment }, deadline)
            .await?;
        match reply {
            RobotFrame::JobAccept { .. } => Ok(AssignReply::Accepted),
            RobotFrame::JobReject { reason, .. } => Ok(AssignReply::Rejected(reason)),
            other => Err(OrchestratorError::Transport(format!(
                "unexpected reply to assignment: {other:?}"
            ))),
        }
    }

    async fn cancel(
        &self,
        robot: &RobotId,
        job: &JobId,
        deadline: Duration,
    ) -> Result<bool, OrchestratorError> {
        let reply = self
            .request(robot, FleetFrame::JobCancel { job_id: job.clone() }, deadline)
            .await?;
        Ok(matches!(reply, RobotFrame::JobCancelled { .. }))
    }
}

/// The accept loop plus per-connection protocol handling.
pub struct ChannelServer<C: Clock> {
    config: ChannelConfig,
    manager: Arc<ConnectionManager>,
    registry: Arc<RobotRegistry>,
    dispatcher: Arc<Dispatcher<ConnectionManager, C>>,
    events: FleetEvents,
    auth: Arc<AuthConfig>,
    activity: Arc<ActivityLogger>,
    clock: C,
}

impl<C: Clock> ChannelServer<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ChannelConfig,
        manager: Arc<ConnectionManager>,
        registry: Arc<RobotRegistry>,
        dispatcher: Arc<Dispatcher<ConnectionManager, C>>,
        events: FleetEvents,
        auth: Arc<AuthConfig>,
        activity: Arc<ActivityLogger>,
        clock: C,
    ) -> Self {
        Self { config, manager, registry, dispatcher, events, auth, activity, clock }
    }

    /// Bind and serve until the token fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "robot channel listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "robot connection accepted");
                            let server = self.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, shutdown).await {
                                    tracing::warn!(error = %e, "robot connection ended with error");
                                }
                            });
                        }
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("robot channel shutting down");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        shutdown: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
        let (mut sink, mut reader) = ws.split();

        let (out_tx, mut out_rx) = mpsc::channel::<FleetEnvelope>(64);
        let mut robot_id: Option<RobotId> = None;
        let mut ping_timer = tokio::time::interval(self.config.ping_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_seen = self.clock.now();
        let liveness_budget = self.config.ping_interval + self.config.pong_timeout;

        let result = loop {
            tokio::select! {
                incoming = reader.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            last_seen = self.clock.now();
                            let envelope: RobotEnvelope = match decode(&text) {
                                Ok(envelope) => envelope,
                                Err(e) => {
                                    tracing::warn!(error = %e, "malformed robot frame");
                                    let reply = FleetEnvelope::new(FleetFrame::Error {
                                        message: format!("malformed frame: {e}"),
                                    });
                                    let _ = send_envelope(&mut sink, &reply).await;
                                    continue;
                                }
                            };
                            match self.handle_frame(envelope, &out_tx, &mut robot_id).await {
                                FrameAction::Continue => {}
                                FrameAction::Close => break Ok(()),
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_seen = self.clock.now();
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            last_seen = self.clock.now();
                            let _ = sink.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break Ok(()),
                        Some(Ok(_)) => {} // binary frames ignored
                        Some(Err(e)) => {
                            break Err(OrchestratorError::Transport(e.to_string()));
                        }
                    }
                }
                outgoing = out_rx.recv() => {
                    match outgoing {
                        Some(envelope) => {
                            if send_envelope(&mut sink, &envelope).await.is_err() {
                                break Err(OrchestratorError::Transport(
                                    "send failed".to_string(),
                                ));
                            }
                        }
                        None => break Ok(()),
                    }
                }
                _ = ping_timer.tick() => {
                    if self.clock.now().duration_since(last_seen) > liveness_budget {
                        tracing::warn!(robot = ?robot_id, "pong deadline missed, closing");
                        break Ok(());
                    }
                    if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break Err(OrchestratorError::Transport("ping failed".to_string()));
                    }
                }
                _ = shutdown.cancelled() => break Ok(()),
            }
        };

        if let Some(id) = robot_id {
            self.manager.detach(&id);
            // Offline stops new dispatch immediately; in-flight jobs keep
            // their grace period until the health sweep drains them.
            self.registry.update_status(&id, RobotStatus::Offline);
            self.events
                .emit(FleetEvent::RobotStatus { robot_id: id.clone(), status: RobotStatus::Offline });
            self.activity.append(id.as_str(), "disconnected");
            tracing::info!(robot = %id, "robot disconnected");
        }
        result
    }

    /// Run a dispatch pass on its own task.
    fn spawn_tick(&self) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.tick().await;
        });
    }

    async fn handle_frame(
        &self,
        envelope: RobotEnvelope,
        out_tx: &mpsc::Sender<FleetEnvelope>,
        robot_id: &mut Option<RobotId>,
    ) -> FrameAction {
        // Correlated replies resolve pending requests first.
        if let Some(correlation) = &envelope.correlation_id {
            if self.manager.resolve(correlation, envelope.payload.clone()) {
                return FrameAction::Continue;
            }
        }

        match envelope.payload {
            RobotFrame::Register { spec, token, robot_id: reclaimed } => {
                if !self.auth.verify(token.as_deref()) {
                    tracing::warn!(name = %spec.name, "robot failed authentication");
                    let reply = FleetEnvelope::new(FleetFrame::RegisterAck {
                        success: false,
                        robot_id: None,
                        message: Some("authentication failed".to_string()),
                    });
                    let _ = out_tx.send(reply).await;
                    return FrameAction::Close;
                }

                let id = reclaimed.unwrap_or_else(RobotId::generate);
                let robot = Robot {
                    id: id.clone(),
                    name: spec.name.clone(),
                    status: RobotStatus::Online,
                    max_concurrent_jobs: spec.max_concurrent_jobs,
                    current_job_ids: Default::default(),
                    capabilities: spec.capabilities,
                    last_heartbeat_ms: self.clock.epoch_ms(),
                    environment: spec.environment,
                    tags: spec.tags,
                };
                self.registry.register(robot);
                self.manager.attach(id.clone(), out_tx.clone());
                *robot_id = Some(id.clone());

                self.events.emit(FleetEvent::RobotStatus {
                    robot_id: id.clone(),
                    status: RobotStatus::Online,
                });
                self.activity.append(id.as_str(), &format!("registered name={}", spec.name));
                tracing::info!(robot = %id, name = %spec.name, "robot registered");

                let ack = FleetEnvelope::new(FleetFrame::RegisterAck {
                    success: true,
                    robot_id: Some(id),
                    message: None,
                });
                let _ = out_tx.send(ack).await;

                // A fresh robot may unblock queued work. The pass runs
                // on its own task: assignment replies arrive through
                // this read loop, so awaiting here would deadlock.
                self.spawn_tick();
                FrameAction::Continue
            }

            RobotFrame::Heartbeat { metrics } => {
                if let Some(id) = robot_id {
                    self.registry.heartbeat(id, self.clock.epoch_ms());
                    if let Some(m) = metrics {
                        tracing::trace!(
                            robot = %id,
                            cpu = m.cpu_percent,
                            memory = m.memory_percent,
                            "heartbeat metrics"
                        );
                    }
                    let _ = out_tx.send(FleetEnvelope::new(FleetFrame::HeartbeatAck)).await;
                }
                FrameAction::Continue
            }

            RobotFrame::Disconnect { reason } => {
                if let Some(id) = robot_id {
                    self.activity.append(
                        id.as_str(),
                        &format!("disconnect requested: {}", reason.unwrap_or_default()),
                    );
                }
                FrameAction::Close
            }

            RobotFrame::JobProgress { job_id, progress, node_id } => {
                self.dispatcher.handle_progress(&job_id, progress, node_id);
                FrameAction::Continue
            }

            RobotFrame::JobComplete { job_id, result } => {
                if let Some(id) = robot_id {
                    self.dispatcher.handle_complete(id, &job_id, result);
                    // The freed slot may fit another queued job.
                    self.spawn_tick();
                }
                FrameAction::Continue
            }

            RobotFrame::JobFailed { job_id, error, kind } => {
                if let Some(id) = robot_id {
                    self.dispatcher.handle_failed(id, &job_id, error, kind);
                    self.spawn_tick();
                }
                FrameAction::Continue
            }

            RobotFrame::JobCancelled { job_id } => {
                if let Some(id) = robot_id {
                    self.dispatcher.handle_cancelled(id, &job_id);
                }
                FrameAction::Continue
            }

            RobotFrame::LogEntry { entry } => {
                if let Some(id) = robot_id {
                    self.activity
                        .append(id.as_str(), &format!("[{}] {}", entry.level, entry.message));
                }
                FrameAction::Continue
            }

            RobotFrame::LogBatch { entries } => {
                if let Some(id) = robot_id {
                    for entry in entries {
                        self.activity
                            .append(id.as_str(), &format!("[{}] {}", entry.level, entry.message));
                    }
                }
                FrameAction::Continue
            }

            // Uncorrelated accept/reject/status frames have no pending
            // request to resolve; nothing to do with them.
            RobotFrame::JobAccept { .. }
            | RobotFrame::JobReject { .. }
            | RobotFrame::StatusResponse { .. } => {
                tracing::debug!("uncorrelated response frame dropped");
                FrameAction::Continue
            }
        }
    }
}

enum FrameAction {
    Continue,
    Close,
}

async fn send_envelope<S>(sink: &mut S, envelope: &FleetEnvelope) -> Result<(), OrchestratorError>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = encode(envelope).map_err(|e| OrchestratorError::Transport(e.to_string()))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| OrchestratorError::Transport(e.to_string()))
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
