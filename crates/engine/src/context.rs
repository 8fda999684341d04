// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run execution state: variables, node outputs, signals, resources.

use armada_core::{RunError, Value};
use armada_core::NodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

/// Cooperative pause gate.
///
/// While set (the initial state) execution proceeds; when cleared, the
/// engine blocks at the next suspension point until set again. Shared by
/// branch clones so a pause covers the whole run.
#[derive(Clone)]
pub struct PauseSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl PauseSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    /// Clear the gate: execution blocks at the next suspension point.
    pub fn pause(&self) {
        let _ = self.tx.send(false);
    }

    /// Set the gate: blocked waiters proceed.
    pub fn resume(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_paused(&self) -> bool {
        !*self.tx.borrow()
    }

    /// Block until the gate is set. Returns immediately when running.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped: treat as running so a detached clone
                // cannot wedge the engine.
                return;
            }
        }
    }
}

impl Default for PauseSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot cooperative cancellation flag.
#[derive(Clone, Default)]
pub struct CancelSignal {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve when the flag is raised (immediately if already raised).
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Externally managed opaque handles (browsers, HTTP clients).
///
/// Reference-shared across branch clones; the engine never creates,
/// duplicates, or destroys the handles themselves.
#[derive(Clone, Default)]
pub struct ResourceMap {
    inner: Arc<Mutex<HashMap<String, Arc<dyn std::any::Any + Send + Sync>>>>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: Arc<dyn std::any::Any + Send + Sync>) {
        self.inner.lock().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn std::any::Any + Send + Sync>> {
        self.inner.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }
}

/// Per-run scoped state handed to every node.
pub struct ExecutionContext {
    pub variables: HashMap<String, Value>,
    pub outputs_by_node: HashMap<NodeId, HashMap<String, Value>>,
    pub errors: Vec<RunError>,
    pub resources: ResourceMap,
    pub pause: PauseSignal,
    pub cancel: CancelSignal,
    /// Label of the branch this context serves (empty for the root).
    pub branch: String,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            outputs_by_node: HashMap::new(),
            errors: Vec::new(),
            resources: ResourceMap::new(),
            pause: PauseSignal::new(),
            cancel: CancelSignal::new(),
            branch: String::new(),
        }
    }

    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        Self { variables, ..Self::new() }
    }

    /// Total: overwrites any existing value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Total: yields `default` when unset.
    pub fn get_variable_or(&self, name: &str, default: Value) -> Value {
        self.variables.get(name).cloned().unwrap_or(default)
    }

    pub fn record_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Output value a node produced on a port, if any.
    pub fn output(&self, node: &NodeId, port: &str) -> Option<&Value> {
        self.outputs_by_node.get(node).and_then(|m| m.get(port))
    }

    /// Block while paused; wakes early when cancellation is raised so a
    /// paused run can still be cancelled.
    pub async fn wait_if_paused(&self) {
        tokio::select! {
            _ = self.pause.wait() => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Derive a context for a parallel branch or nested scope.
    ///
    /// Variables are copied (writes stay local to the clone), resources and
    /// signals are shared, outputs and errors start fresh.
    pub fn clone_for_branch(&self, label: impl Into<String>) -> ExecutionContext {
        ExecutionContext {
            variables: self.variables.clone(),
            outputs_by_node: HashMap::new(),
            errors: Vec::new(),
            resources: self.resources.clone(),
            pause: self.pause.clone(),
            cancel: self.cancel.clone(),
            branch: label.into(),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
