// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy shared across the engine and the orchestrator

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Classification of every failure surfaced by the system.
///
/// All errors map onto one of these kinds before crossing a component
/// boundary; the dispatcher uses the classification to decide whether a
/// failed job is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Workflow blob rejected at load time
    Validation,
    /// Required input port unresolved after binding
    Input,
    /// Per-node or per-job timer fired
    Timeout,
    /// Node implementation raised
    Runtime,
    /// Transport, storage, or auth failed
    External,
    /// Cooperative cancellation
    Cancelled,
    /// Referenced robot, job, or schedule missing
    NotFound,
}

impl FailureKind {
    /// Whether the dispatcher may retry a job that failed with this kind.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::External)
    }
}

crate::simple_display! {
    FailureKind {
        Validation => "validation",
        Input => "input",
        Timeout => "timeout",
        Runtime => "runtime",
        External => "external",
        Cancelled => "cancelled",
        NotFound => "not_found",
    }
}

/// One recorded failure inside a run, kept in the execution context's
/// append-only error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
    pub kind: FailureKind,
    pub at_ms: u64,
}

impl RunError {
    pub fn new(node_id: Option<NodeId>, message: impl Into<String>, kind: FailureKind, at_ms: u64) -> Self {
        Self { node_id, message: message.into(), kind, at_ms }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(node) => write!(f, "[{}] {} ({})", node, self.message, self.kind),
            None => write!(f, "{} ({})", self.message, self.kind),
        }
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
