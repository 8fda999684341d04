// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint record: everything needed to resume a run after a crash.

use armada_core::{JobId, NodeId, Value};
use armada_engine::ReplayedStep;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Durable state of a job's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Cancelled)
    }
}

armada_core::simple_display! {
    RunState {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Persisted snapshot of one job's execution, keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job_id: JobId,
    pub state: RunState,
    /// Nodes completed so far, in completion order (unique).
    #[serde(default)]
    pub executed_nodes: Vec<NodeId>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Per-node completion records for resume-skipping.
    #[serde(default)]
    pub step_results: HashMap<NodeId, ReplayedStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Hash of the workflow blob this run executes; drift between
    /// submission and resume is detectable by comparing hashes.
    #[serde(default)]
    pub blob_hash: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Checkpoint {
    pub fn new(job_id: JobId, blob_hash: impl Into<String>, now_ms: u64) -> Self {
        Self {
            job_id,
            state: RunState::Pending,
            executed_nodes: Vec::new(),
            variables: HashMap::new(),
            step_results: HashMap::new(),
            error: None,
            blob_hash: blob_hash.into(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
