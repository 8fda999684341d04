// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow graph interpreter.
//!
//! Control flow advances only along execution edges. A completed node
//! names the execution ports to fire; every node connected through one of
//! them becomes ready once its data producers have settled. Loops re-enter
//! through `loop_back_to`, never by blindly resuming after the loop end.

use crate::context::ExecutionContext;
use crate::events::RunEvents;
use crate::executor::{bind_inputs, DebugGate, NodeExecutor, ProgressHint, DEFAULT_NODE_TIMEOUT};
use crate::node::{LoopStates, NodeInstance, NodeResult};
use crate::nodes::SubflowNode;
use crate::registry::NodeRegistry;
use armada_core::{FailureKind, NodeId, RunError, RunEvent, Value};
use armada_model::{node_types, NodeSpec, Workflow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How ready nodes are drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// One node at a time, in trigger order.
    #[default]
    Sequential,
    /// Data-independent plain nodes execute concurrently on branch-clone
    /// contexts; control nodes stay sequential.
    Parallel,
}

/// Run-level knobs.
#[derive(Clone)]
pub struct EngineSettings {
    pub strategy: ExecutionStrategy,
    pub node_timeout: Duration,
    /// Debug gate; present means breakpoints are honored.
    pub debug_gate: Option<Arc<DebugGate>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { strategy: ExecutionStrategy::default(), node_timeout: DEFAULT_NODE_TIMEOUT, debug_gate: None }
    }
}

/// A completed step as recorded for resume: enough to skip the node and
/// keep walking the graph it unlocked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayedStep {
    pub outputs: HashMap<String, Value>,
    pub next_ports: Vec<String>,
}

/// Snapshot handed to the step hook after every completed node. The
/// durable runtime checkpoints from here.
pub struct StepRecord<'a> {
    pub node_id: &'a NodeId,
    pub step: &'a ReplayedStep,
    pub executed_nodes: &'a [NodeId],
    pub variables: &'a HashMap<String, Value>,
}

type StepHook = Box<dyn Fn(StepRecord<'_>) + Send + Sync>;

/// Terminal result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { executed_nodes: Vec<NodeId>, variables: HashMap<String, Value> },
    Failed { error: RunError, executed_nodes: Vec<NodeId> },
    Cancelled { executed_nodes: Vec<NodeId> },
    Stopped { reason: String, executed_nodes: Vec<NodeId> },
}

impl RunOutcome {
    pub fn executed_nodes(&self) -> &[NodeId] {
        match self {
            RunOutcome::Completed { executed_nodes, .. }
            | RunOutcome::Failed { executed_nodes, .. }
            | RunOutcome::Cancelled { executed_nodes }
            | RunOutcome::Stopped { executed_nodes, .. } => executed_nodes,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Merge one branch's node outputs into the run's map.
///
/// Associative and commutative over disjoint-key maps: each node writes
/// only its own entry, so parallel branches never collide.
pub fn parallel_merge(
    into: &mut HashMap<NodeId, HashMap<String, Value>>,
    from: HashMap<NodeId, HashMap<String, Value>>,
) {
    for (node, ports) in from {
        into.entry(node).or_default().extend(ports);
    }
}

/// Node types the engine schedules strictly sequentially: they mutate
/// engine state (loops), interpret nested graphs, or anchor control flow.
fn is_control_type(node_type: &str) -> bool {
    node_types::is_loop_start(node_type)
        || node_types::is_loop_end(node_type)
        || matches!(
            node_type,
            node_types::BREAK
                | node_types::CONTINUE
                | node_types::SUBFLOW
                | node_types::TRY_CATCH
                | "SetVariable"
        )
}

pub struct WorkflowEngine {
    workflow: Arc<Workflow>,
    registry: Arc<NodeRegistry>,
    events: RunEvents,
    settings: EngineSettings,
    replay: HashMap<NodeId, ReplayedStep>,
    on_step: Option<StepHook>,
    stop_reason: Arc<Mutex<Option<String>>>,
}

impl WorkflowEngine {
    pub fn new(workflow: Arc<Workflow>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            workflow,
            registry,
            events: RunEvents::new(),
            settings: EngineSettings::default(),
            replay: HashMap::new(),
            on_step: None,
            stop_reason: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: RunEvents) -> Self {
        self.events = events;
        self
    }

    /// Seed completed steps from a checkpoint; the run skips them.
    pub fn with_replay(mut self, replay: HashMap<NodeId, ReplayedStep>) -> Self {
        self.replay = replay;
        self
    }

    /// Hook invoked after every freshly executed node.
    pub fn with_step_hook(mut self, hook: StepHook) -> Self {
        self.on_step = Some(hook);
        self
    }

    pub fn events(&self) -> &RunEvents {
        &self.events
    }

    /// Deliberate external halt, distinct from cancellation. Takes effect
    /// at the next dispatch point.
    pub fn request_stop(&self, reason: impl Into<String>) {
        *self.stop_reason.lock() = Some(reason.into());
    }

    /// Execute the workflow to a terminal outcome.
    pub async fn run(&self, ctx: &mut ExecutionContext) -> RunOutcome {
        let started = Instant::now();
        let total = self.workflow.node_count().max(1);
        let loop_members = self.loop_membership();
        let protection = self.protection_map();

        let executor = Arc::new(self.make_executor());

        let mut instances: HashMap<NodeId, Arc<dyn NodeInstance>> = HashMap::new();
        let mut executed_set: HashSet<NodeId> = HashSet::new();
        let mut executed_order: Vec<NodeId> = Vec::new();
        let mut scheduled: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut waiting: Vec<NodeId> = Vec::new();
        let mut forced: HashSet<NodeId> = HashSet::new();
        let mut loops: LoopStates = LoopStates::new();

        self.events.emit(RunEvent::WorkflowStarted {
            total_nodes: self.workflow.node_count(),
            recovered: !self.replay.is_empty(),
        });

        match self.workflow.find_start_node() {
            Some(start) => {
                scheduled.insert(start.clone());
                queue.push_back(start);
            }
            None => {
                for entry in self.workflow.find_entry_nodes() {
                    scheduled.insert(entry.clone());
                    queue.push_back(entry);
                }
            }
        }

        loop {
            let Some(node_id) = queue.pop_front() else {
                if !waiting.is_empty() {
                    // Nothing left that could produce the missing data:
                    // run the deferred nodes with null bindings.
                    for node in waiting.drain(..) {
                        forced.insert(node.clone());
                        queue.push_back(node);
                    }
                    continue;
                }
                break;
            };
            scheduled.remove(&node_id);

            ctx.wait_if_paused().await;
            if ctx.cancel.is_cancelled() {
                self.events
                    .emit(RunEvent::WorkflowCancelled { executed_nodes: executed_order.len() });
                return RunOutcome::Cancelled { executed_nodes: executed_order };
            }
            if let Some(reason) = self.stop_reason.lock().take() {
                return RunOutcome::Stopped { reason, executed_nodes: executed_order };
            }

            // Resume: skip checkpointed nodes, walking their recorded ports.
            if !executed_set.contains(&node_id) && !loop_members.contains(&node_id) {
                if let Some(step) = self.replay.get(&node_id) {
                    if !step.outputs.is_empty() {
                        ctx.outputs_by_node
                            .entry(node_id.clone())
                            .or_default()
                            .extend(step.outputs.clone());
                    }
                    executed_set.insert(node_id.clone());
                    executed_order.push(node_id.clone());
                    let ports = step.next_ports.clone();
                    self.schedule_successors(
                        &node_id,
                        &ports,
                        &executed_set,
                        &mut scheduled,
                        &mut queue,
                    );
                    continue;
                }
            }

            if !forced.contains(&node_id)
                && !self.data_ready(&node_id, &executed_set, &scheduled, &waiting)
            {
                waiting.push(node_id);
                continue;
            }

            let Some(spec) = self.workflow.node(&node_id).cloned() else {
                return self.fail(
                    ctx,
                    RunError::new(
                        Some(node_id.clone()),
                        format!("node '{node_id}' missing from workflow"),
                        FailureKind::Validation,
                        epoch_ms(),
                    ),
                    executed_order,
                );
            };

            let hint = ProgressHint {
                on_start: percent(executed_set.len(), total),
                on_complete: percent(executed_set.len() + 1, total),
            };

            let mut batch_results: Vec<(NodeId, NodeResult)> = Vec::new();

            if self.settings.strategy == ExecutionStrategy::Parallel
                && !is_control_type(&spec.node_type)
            {
                let batch =
                    self.collect_batch(spec, &mut queue, &mut scheduled, &executed_set, &waiting);
                batch_results
                    .extend(self.execute_batch(batch, ctx, executor.clone(), hint).await);
            } else if spec.node_type == node_types::SUBFLOW {
                let result = self.run_subflow(&spec, ctx, hint).await;
                batch_results.push((node_id.clone(), result));
            } else {
                let instance = match instances.get(&node_id) {
                    Some(i) => i.clone(),
                    None => match self.registry.instantiate(&spec) {
                        Some(i) => {
                            let shared: Arc<dyn NodeInstance> = Arc::from(i);
                            instances.insert(node_id.clone(), shared.clone());
                            shared
                        }
                        None => {
                            return self.fail(
                                ctx,
                                RunError::new(
                                    Some(node_id.clone()),
                                    format!("unknown node type '{}'", spec.node_type),
                                    FailureKind::Validation,
                                    epoch_ms(),
                                ),
                                executed_order,
                            );
                        }
                    },
                };
                let result = executor
                    .execute(&self.workflow, &spec, instance.as_ref(), ctx, &mut loops, hint)
                    .await;
                batch_results.push((node_id.clone(), result));
            }

            forced.remove(&node_id);

            for (completed_id, result) in batch_results {
                match result {
                    NodeResult::Success { outputs, next_ports, loop_back_to } => {
                        if executed_set.insert(completed_id.clone()) {
                            executed_order.push(completed_id.clone());
                        }
                        if let Some(hook) = &self.on_step {
                            hook(StepRecord {
                                node_id: &completed_id,
                                step: &ReplayedStep {
                                    outputs: outputs.clone(),
                                    next_ports: next_ports.clone(),
                                },
                                executed_nodes: &executed_order,
                                variables: &ctx.variables,
                            });
                        }

                        if let Some(target) = loop_back_to {
                            // Loop re-entry is the one sanctioned way back
                            // into an executed node.
                            if !scheduled.contains(&target) {
                                scheduled.insert(target.clone());
                                queue.push_front(target);
                            }
                            continue;
                        }

                        // A loop start firing its body re-arms the body
                        // nodes for another iteration.
                        if let Some(spec) = self.workflow.node(&completed_id) {
                            if node_types::is_loop_start(&spec.node_type)
                                && next_ports.iter().any(|p| p == "body")
                            {
                                for member in self.body_members(&completed_id) {
                                    executed_set.remove(&member);
                                }
                            }
                        }

                        self.schedule_successors(
                            &completed_id,
                            &next_ports,
                            &executed_set,
                            &mut scheduled,
                            &mut queue,
                        );

                        // Re-examine deferred nodes now that data landed.
                        if !waiting.is_empty() {
                            for node in waiting.drain(..) {
                                if !scheduled.contains(&node) {
                                    scheduled.insert(node.clone());
                                    queue.push_back(node);
                                }
                            }
                        }
                    }
                    NodeResult::Failure { kind: FailureKind::Cancelled, .. } => {
                        self.events.emit(RunEvent::WorkflowCancelled {
                            executed_nodes: executed_order.len(),
                        });
                        return RunOutcome::Cancelled { executed_nodes: executed_order };
                    }
                    NodeResult::Failure { message, kind, node_id: failed } => {
                        let error =
                            RunError::new(Some(failed.clone()), message, kind, epoch_ms());
                        ctx.record_error(error.clone());

                        if let Some(tc) = handler_for(&failed, &protection) {
                            tracing::debug!(
                                node = %failed,
                                handler = %tc,
                                "failure routed to catch branch"
                            );
                            let mut caught = HashMap::new();
                            caught.insert(
                                "error_message".to_string(),
                                Value::String(error.message.clone()),
                            );
                            caught.insert(
                                "error_node".to_string(),
                                Value::String(failed.to_string()),
                            );
                            ctx.outputs_by_node
                                .entry(tc.clone())
                                .or_default()
                                .extend(caught);
                            ctx.set_variable(
                                "_error_message",
                                Value::String(error.message.clone()),
                            );
                            ctx.set_variable("_error_node", Value::String(failed.to_string()));

                            self.schedule_successors(
                                &tc,
                                &["catch".to_string()],
                                &executed_set,
                                &mut scheduled,
                                &mut queue,
                            );
                            continue;
                        }

                        return self.fail(ctx, error, executed_order);
                    }
                    NodeResult::Skipped { reason } => {
                        tracing::debug!(node = %completed_id, reason, "skipped node");
                        if executed_set.insert(completed_id.clone()) {
                            executed_order.push(completed_id.clone());
                        }
                        self.schedule_successors(
                            &completed_id,
                            &["exec_out".to_string()],
                            &executed_set,
                            &mut scheduled,
                            &mut queue,
                        );
                    }
                }
            }
        }

        self.events.emit(RunEvent::WorkflowCompleted {
            executed_nodes: executed_order.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        RunOutcome::Completed { executed_nodes: executed_order, variables: ctx.variables.clone() }
    }

    fn make_executor(&self) -> NodeExecutor {
        let mut executor =
            NodeExecutor::new(self.events.clone()).with_timeout(self.settings.node_timeout);
        if let Some(gate) = &self.settings.debug_gate {
            executor = executor.with_debug_gate(gate.clone());
        }
        executor
    }

    fn fail(
        &self,
        ctx: &mut ExecutionContext,
        error: RunError,
        executed_nodes: Vec<NodeId>,
    ) -> RunOutcome {
        if !ctx.errors.iter().any(|e| e == &error) {
            ctx.record_error(error.clone());
        }
        self.events.emit(RunEvent::WorkflowFailed {
            message: error.message.clone(),
            kind: error.kind,
            node_id: error.node_id.clone(),
        });
        RunOutcome::Failed { error, executed_nodes }
    }

    fn schedule_successors(
        &self,
        node: &NodeId,
        ports: &[String],
        executed: &HashSet<NodeId>,
        scheduled: &mut HashSet<NodeId>,
        queue: &mut VecDeque<NodeId>,
    ) {
        for port in ports {
            for succ in self.workflow.execution_successors(node, port) {
                if executed.contains(&succ) || scheduled.contains(&succ) {
                    continue;
                }
                scheduled.insert(succ.clone());
                queue.push_back(succ);
            }
        }
    }

    /// A node is data-ready when every incoming data edge's producer has
    /// either executed or will never run. Producers still scheduled defer
    /// the node.
    fn data_ready(
        &self,
        node: &NodeId,
        executed: &HashSet<NodeId>,
        scheduled: &HashSet<NodeId>,
        waiting: &[NodeId],
    ) -> bool {
        for conn in self.workflow.data_sources(node).values() {
            let src = &conn.source_node;
            if executed.contains(src) {
                continue;
            }
            if scheduled.contains(src) || waiting.contains(src) {
                return false;
            }
        }
        true
    }

    /// Pull additional plain, mutually data-independent ready nodes from
    /// the queue to run alongside `first`.
    fn collect_batch(
        &self,
        first: NodeSpec,
        queue: &mut VecDeque<NodeId>,
        scheduled: &mut HashSet<NodeId>,
        executed: &HashSet<NodeId>,
        waiting: &[NodeId],
    ) -> Vec<NodeSpec> {
        let mut batch = vec![first];
        let mut rest: VecDeque<NodeId> = VecDeque::new();

        while let Some(candidate) = queue.pop_front() {
            let eligible = self
                .workflow
                .node(&candidate)
                .map(|spec| !is_control_type(&spec.node_type))
                .unwrap_or(false)
                && self.data_ready(&candidate, executed, scheduled, waiting)
                && !self.data_linked(&candidate, &batch);
            if eligible {
                scheduled.remove(&candidate);
                if let Some(spec) = self.workflow.node(&candidate) {
                    batch.push(spec.clone());
                }
            } else {
                rest.push_back(candidate);
            }
        }
        *queue = rest;
        batch
    }

    /// Any data edge between `candidate` and a batch member, either way.
    fn data_linked(&self, candidate: &NodeId, batch: &[NodeSpec]) -> bool {
        self.workflow.data_sources(candidate).values().any(|conn| {
            batch.iter().any(|member| member.id == conn.source_node)
        }) || batch.iter().any(|member| {
            self.workflow
                .data_sources(&member.id)
                .values()
                .any(|conn| &conn.source_node == candidate)
        })
    }

    /// Run a batch concurrently on branch-clone contexts; merge outputs,
    /// discard variable writes.
    async fn execute_batch(
        &self,
        batch: Vec<NodeSpec>,
        ctx: &mut ExecutionContext,
        executor: Arc<NodeExecutor>,
        hint: ProgressHint,
    ) -> Vec<(NodeId, NodeResult)> {
        if batch.len() == 1 {
            // Single-node batch: run in place so variable writes stick.
            let spec = &batch[0];
            let result = match self.registry.instantiate(spec) {
                Some(instance) => {
                    let mut loops = LoopStates::new();
                    executor
                        .execute(&self.workflow, spec, instance.as_ref(), ctx, &mut loops, hint)
                        .await
                }
                None => NodeResult::fail(
                    spec.id.clone(),
                    FailureKind::Validation,
                    format!("unknown node type '{}'", spec.node_type),
                ),
            };
            return vec![(batch[0].id.clone(), result)];
        }

        let mut handles = Vec::with_capacity(batch.len());
        for spec in batch {
            let workflow = self.workflow.clone();
            let registry = self.registry.clone();
            let executor = executor.clone();
            let mut branch_ctx = ctx.clone_for_branch(spec.id.to_string());
            // Producers are visible to the branch for input binding.
            branch_ctx.outputs_by_node = ctx.outputs_by_node.clone();

            handles.push(tokio::spawn(async move {
                let result = match registry.instantiate(&spec) {
                    Some(instance) => {
                        let mut loops = LoopStates::new();
                        executor
                            .execute(
                                &workflow,
                                &spec,
                                instance.as_ref(),
                                &mut branch_ctx,
                                &mut loops,
                                hint,
                            )
                            .await
                    }
                    None => NodeResult::fail(
                        spec.id.clone(),
                        FailureKind::Validation,
                        format!("unknown node type '{}'", spec.node_type),
                    ),
                };
                (spec.id.clone(), result, branch_ctx)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((node_id, result, branch_ctx)) => {
                    let mut produced = branch_ctx.outputs_by_node;
                    // Only this branch's own writes merge back.
                    produced.retain(|node, _| node == &node_id);
                    parallel_merge(&mut ctx.outputs_by_node, produced);
                    ctx.errors.extend(branch_ctx.errors);
                    results.push((node_id, result));
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "parallel branch task failed");
                }
            }
        }
        results
    }

    /// Interpret a Subflow node: nested graph on a branch-clone context.
    async fn run_subflow(
        &self,
        spec: &NodeSpec,
        ctx: &mut ExecutionContext,
        hint: ProgressHint,
    ) -> NodeResult {
        let instance = SubflowNode::new(&spec.config);
        let Some(embedded) = instance.workflow().cloned() else {
            return NodeResult::fail(
                spec.id.clone(),
                FailureKind::Validation,
                "subflow has no parseable embedded workflow",
            );
        };

        let inputs = match bind_inputs(&self.workflow, spec, &instance, ctx) {
            Ok(inputs) => inputs,
            Err(missing) => {
                let result = NodeResult::fail(
                    spec.id.clone(),
                    FailureKind::Input,
                    format!("required subflow input '{missing}' resolved to null"),
                );
                if let NodeResult::Failure { message, kind, node_id } = &result {
                    self.events.emit(RunEvent::NodeFailed {
                        node_id: node_id.clone(),
                        message: message.clone(),
                        kind: *kind,
                    });
                }
                return result;
            }
        };

        self.events.emit(RunEvent::NodeStarted {
            node_id: spec.id.clone(),
            node_type: spec.node_type.clone(),
            progress: hint.on_start,
        });

        let mut sub_ctx = ctx.clone_for_branch(format!("subflow:{}", spec.id));
        let subflow_name = if embedded.metadata.name.is_empty() {
            spec.id.to_string()
        } else {
            embedded.metadata.name.clone()
        };
        sub_ctx.set_variable("_subflow_name", Value::String(subflow_name));

        // Declared inputs land as variables (defaults already bound).
        for input in &embedded.inputs {
            let value = inputs.get(&input.name).cloned().unwrap_or(Value::Null);
            sub_ctx.set_variable(input.name.clone(), value);
        }

        // Promoted parameters address internal nodes' config.
        let embedded = apply_promotions(embedded, spec, &mut sub_ctx);
        let embedded = Arc::new(embedded);

        let sub_engine = WorkflowEngine::new(embedded.clone(), self.registry.clone())
            .with_settings(self.settings.clone())
            .with_events(self.events.clone());

        let outcome = Box::pin(sub_engine.run(&mut sub_ctx)).await;

        match outcome {
            RunOutcome::Completed { .. } => {
                let mut outputs = HashMap::new();
                for output in &embedded.outputs {
                    let value = match (&output.node_id, &output.port) {
                        (Some(node), Some(port)) => {
                            sub_ctx.output(node, port).cloned().unwrap_or(Value::Null)
                        }
                        _ => sub_ctx.get_variable_or(&output.name, Value::Null),
                    };
                    outputs.insert(output.name.clone(), value);
                }
                if !outputs.is_empty() {
                    ctx.outputs_by_node
                        .entry(spec.id.clone())
                        .or_default()
                        .extend(outputs.clone());
                }
                self.events.emit(RunEvent::NodeCompleted {
                    node_id: spec.id.clone(),
                    progress: hint.on_complete,
                });
                NodeResult::Success {
                    outputs,
                    next_ports: vec!["exec_out".to_string()],
                    loop_back_to: None,
                }
            }
            RunOutcome::Failed { error, .. } => {
                NodeResult::fail(spec.id.clone(), error.kind, error.message)
            }
            RunOutcome::Cancelled { .. } => {
                NodeResult::fail(spec.id.clone(), FailureKind::Cancelled, "subflow cancelled")
            }
            RunOutcome::Stopped { reason, .. } => NodeResult::fail(
                spec.id.clone(),
                FailureKind::Runtime,
                format!("subflow stopped: {reason}"),
            ),
        }
    }

    /// Nodes that belong to any loop body (plus the loop pairs
    /// themselves); these are exempt from resume-skipping.
    fn loop_membership(&self) -> HashSet<NodeId> {
        let mut members = HashSet::new();
        for node in self.workflow.nodes.values() {
            if node_types::is_loop_start(&node.node_type) {
                members.insert(node.id.clone());
                members.extend(self.body_members(&node.id));
            }
            if node_types::is_loop_end(&node.node_type) {
                members.insert(node.id.clone());
            }
        }
        members
    }

    /// Nodes reachable along execution edges from a loop start's `body`
    /// port.
    fn body_members(&self, start: &NodeId) -> HashSet<NodeId> {
        let mut members = HashSet::new();
        let mut frontier: Vec<NodeId> = self.workflow.execution_successors(start, "body");
        while let Some(node) = frontier.pop() {
            if node == *start || !members.insert(node.clone()) {
                continue;
            }
            if let Some(spec) = self.workflow.node(&node) {
                for port in spec_exec_ports(spec, &*self.registry) {
                    frontier.extend(self.workflow.execution_successors(&node, &port));
                }
            }
        }
        members
    }

    /// Try/catch coverage: protected-node sets per TryCatch node,
    /// innermost (smallest) first.
    fn protection_map(&self) -> Vec<(NodeId, HashSet<NodeId>)> {
        let mut map = Vec::new();
        for node in self.workflow.nodes.values() {
            if node.node_type != node_types::TRY_CATCH {
                continue;
            }
            let mut protected = HashSet::new();
            let mut frontier: Vec<NodeId> =
                self.workflow.execution_successors(&node.id, "try");
            while let Some(member) = frontier.pop() {
                if !protected.insert(member.clone()) {
                    continue;
                }
                if let Some(spec) = self.workflow.node(&member) {
                    for port in spec_exec_ports(spec, &*self.registry) {
                        frontier.extend(self.workflow.execution_successors(&member, &port));
                    }
                }
            }
            map.push((node.id.clone(), protected));
        }
        map.sort_by_key(|(_, set)| set.len());
        map
    }
}

/// The TryCatch node protecting `failed`, innermost registration first.
fn handler_for(failed: &NodeId, protection: &[(NodeId, HashSet<NodeId>)]) -> Option<NodeId> {
    protection
        .iter()
        .find(|(_, protected)| protected.contains(failed))
        .map(|(tc, _)| tc.clone())
}

/// Execution output port names a node declares.
fn spec_exec_ports(spec: &NodeSpec, registry: &NodeRegistry) -> Vec<String> {
    use armada_model::{PortCatalog, PortDirection};
    registry
        .ports(spec)
        .map(|ports| {
            ports
                .ports
                .into_iter()
                .filter(|p| p.direction == PortDirection::Output && p.is_execution())
                .map(|p| p.name)
                .collect()
        })
        .unwrap_or_default()
}

/// Embedded workflow with promoted parameters applied. Parameters that
/// address a missing node are stored as `_promoted_<node>_<prop>`
/// variables for lazy pickup by whatever instantiates that node later.
fn apply_promotions(
    mut embedded: Workflow,
    spec: &NodeSpec,
    sub_ctx: &mut ExecutionContext,
) -> Workflow {
    let Some(Value::Object(promoted)) = spec.config.get("promoted") else {
        return embedded;
    };
    for (address, value) in promoted {
        let Some((node, prop)) = address.split_once('.') else {
            tracing::warn!(address, "promoted parameter address must be '<node>.<prop>'");
            continue;
        };
        match embedded.nodes.get_mut(node) {
            Some(target) => {
                target.config.insert(prop.to_string(), value.clone());
            }
            None => {
                sub_ctx.set_variable(format!("_promoted_{node}_{prop}"), value.clone());
            }
        }
    }
    embedded
}

fn percent(executed: usize, total: usize) -> u8 {
    ((executed * 100) / total.max(1)).min(100) as u8
}

fn epoch_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
