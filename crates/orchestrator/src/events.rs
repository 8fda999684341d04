// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet event stream for observers.
//!
//! Bounded broadcast: a slow subscriber lags and drops events rather
//! than back-pressuring the orchestrator.

use armada_core::FleetEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 512;

#[derive(Clone)]
pub struct FleetEvents {
    tx: broadcast::Sender<FleetEvent>,
}

impl FleetEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: FleetEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.tx.subscribe()
    }
}

impl Default for FleetEvents {
    fn default() -> Self {
        Self::new()
    }
}
