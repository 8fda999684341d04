// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run event emitter.
//!
//! Each run owns one emitter; the executor and engine publish through it
//! and observers subscribe via an explicit handle. Built on a bounded
//! broadcast channel: slow observers lag and drop, they never block the
//! run.

use armada_core::RunEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct RunEvents {
    tx: broadcast::Sender<RunEvent>,
}

impl RunEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Succeeds regardless of observer count.
    pub fn emit(&self, event: RunEvent) {
        tracing::debug!(event = %event.log_summary(), "run event");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }
}

impl Default for RunEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
