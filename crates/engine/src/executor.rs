// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-node execution: input binding, events, timeout, cancellation.

use crate::context::ExecutionContext;
use crate::node::{LoopStates, NodeCtx, NodeInstance, NodeResult};
use crate::resolve::resolve_value;
use armada_core::{FailureKind, RunEvent, Value};
use armada_model::{NodeSpec, PortDirection, Workflow};
use crate::events::RunEvents;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default per-node timeout.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(120);

/// Config key a node may carry to override the run-level timeout.
const TIMEOUT_CONFIG_KEY: &str = "timeout_secs";

/// Config key marking a breakpoint on a node.
const BREAKPOINT_CONFIG_KEY: &str = "breakpoint";

/// Debugger gate: each `step()` releases one breakpoint wait.
pub struct DebugGate {
    permits: Semaphore,
}

impl DebugGate {
    pub fn new() -> Self {
        Self { permits: Semaphore::new(0) }
    }

    /// Release one blocked breakpoint.
    pub fn step(&self) {
        self.permits.add_permits(1);
    }

    async fn wait(&self) {
        // The semaphore is never closed; acquire only fails after close.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

impl Default for DebugGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress percentages to attach to this node's start/complete events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressHint {
    pub on_start: u8,
    pub on_complete: u8,
}

/// Executes one node at a time under the run's policies.
pub struct NodeExecutor {
    events: RunEvents,
    default_timeout: Duration,
    debug: bool,
    gate: Option<Arc<DebugGate>>,
}

impl NodeExecutor {
    pub fn new(events: RunEvents) -> Self {
        Self { events, default_timeout: DEFAULT_NODE_TIMEOUT, debug: false, gate: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Enable debug mode: nodes flagged with `breakpoint: true` block on
    /// the gate until stepped.
    pub fn with_debug_gate(mut self, gate: Arc<DebugGate>) -> Self {
        self.debug = true;
        self.gate = Some(gate);
        self
    }

    pub fn events(&self) -> &RunEvents {
        &self.events
    }

    /// Run one node: bind inputs, publish events, invoke under timeout,
    /// capture outputs.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        spec: &NodeSpec,
        instance: &dyn NodeInstance,
        ctx: &mut ExecutionContext,
        loops: &mut LoopStates,
        progress: ProgressHint,
    ) -> NodeResult {
        if ctx.cancel.is_cancelled() {
            return self.cancelled(spec);
        }

        let inputs = match bind_inputs(workflow, spec, instance, ctx) {
            Ok(inputs) => inputs,
            Err(missing) => {
                let result = NodeResult::fail(
                    spec.id.clone(),
                    FailureKind::Input,
                    format!("required input '{missing}' resolved to null"),
                );
                self.emit_failure(&result);
                return result;
            }
        };

        self.events.emit(RunEvent::NodeStarted {
            node_id: spec.id.clone(),
            node_type: spec.node_type.clone(),
            progress: progress.on_start,
        });

        // Breakpoints block before invocation, debug mode only.
        if self.debug && breakpoint_set(spec) {
            if let Some(gate) = &self.gate {
                tracing::info!(node = %spec.id, "breakpoint hit, awaiting step");
                gate.wait().await;
            }
        }

        if ctx.cancel.is_cancelled() {
            return self.cancelled(spec);
        }

        let timeout = node_timeout(spec, self.default_timeout);
        let mut node_ctx = NodeCtx {
            node_id: &spec.id,
            node_type: &spec.node_type,
            config: &spec.config,
            inputs,
            context: ctx,
            loops,
        };

        let result = match tokio::time::timeout(timeout, instance.execute(&mut node_ctx)).await {
            Ok(result) => result,
            Err(_) => NodeResult::fail(
                spec.id.clone(),
                FailureKind::Timeout,
                format!("node timed out after {}s", timeout.as_secs()),
            ),
        };

        if ctx.cancel.is_cancelled() {
            return self.cancelled(spec);
        }

        match &result {
            NodeResult::Success { outputs, .. } => {
                if !outputs.is_empty() {
                    ctx.outputs_by_node
                        .entry(spec.id.clone())
                        .or_default()
                        .extend(outputs.clone());
                }
                self.events.emit(RunEvent::NodeCompleted {
                    node_id: spec.id.clone(),
                    progress: progress.on_complete,
                });
            }
            NodeResult::Failure { .. } => self.emit_failure(&result),
            NodeResult::Skipped { reason } => {
                tracing::debug!(node = %spec.id, reason, "node skipped");
            }
        }

        result
    }

    fn cancelled(&self, spec: &NodeSpec) -> NodeResult {
        NodeResult::fail(spec.id.clone(), FailureKind::Cancelled, "run cancelled")
    }

    fn emit_failure(&self, result: &NodeResult) {
        if let NodeResult::Failure { message, kind, node_id } = result {
            self.events.emit(RunEvent::NodeFailed {
                node_id: node_id.clone(),
                message: message.clone(),
                kind: *kind,
            });
        }
    }
}

fn breakpoint_set(spec: &NodeSpec) -> bool {
    spec.config
        .get(BREAKPOINT_CONFIG_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn node_timeout(spec: &NodeSpec, default: Duration) -> Duration {
    spec.config
        .get(TIMEOUT_CONFIG_KEY)
        .and_then(Value::as_f64)
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}

/// Bind a node's data input ports.
///
/// Per port, in order: incoming data connection, then a config key of the
/// same name resolved through the template resolver, then the port's
/// declared default, then null. A required port left null fails the bind.
pub(crate) fn bind_inputs(
    workflow: &Workflow,
    spec: &NodeSpec,
    instance: &dyn NodeInstance,
    ctx: &ExecutionContext,
) -> Result<HashMap<String, Value>, String> {
    let sources = workflow.data_sources(&spec.id);
    let mut bound = HashMap::new();

    for port in instance.ports().ports {
        if port.direction != PortDirection::Input || port.is_execution() {
            continue;
        }

        let value = if let Some(conn) = sources.get(&port.name) {
            ctx.output(&conn.source_node, &conn.source_port)
                .cloned()
                .unwrap_or(Value::Null)
        } else if let Some(raw) = spec.config.get(&port.name) {
            resolve_value(raw, &ctx.variables)
        } else if let Some(default) = &port.default {
            default.clone()
        } else {
            Value::Null
        };

        if port.required && value.is_null() {
            return Err(port.name.clone());
        }
        bound.insert(port.name.clone(), value);
    }

    Ok(bound)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
