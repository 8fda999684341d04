// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded workflow deserialization.
//!
//! Blobs arrive from untrusted callers, so limits are enforced before the
//! graph is handed to validation: blob size, node and connection counts,
//! and identifier lengths. Nothing in a blob is ever evaluated at load
//! time.

use crate::workflow::Workflow;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Bounds applied while loading a workflow blob.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_blob_bytes: usize,
    pub max_nodes: usize,
    pub max_connections: usize,
    pub max_identifier_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_blob_bytes: 8 * 1024 * 1024,
            max_nodes: 2_000,
            max_connections: 8_000,
            max_identifier_len: 256,
        }
    }
}

/// Errors rejecting a blob before validation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("workflow blob exceeds {limit} bytes ({actual} bytes)")]
    BlobTooLarge { actual: usize, limit: usize },
    #[error("workflow has {actual} nodes (limit {limit})")]
    TooManyNodes { actual: usize, limit: usize },
    #[error("workflow has {actual} connections (limit {limit})")]
    TooManyConnections { actual: usize, limit: usize },
    #[error("identifier '{0}' exceeds the identifier length limit")]
    IdentifierTooLong(String),
    #[error("node '{id}' declares a mismatched id field '{field_id}'")]
    NodeIdMismatch { id: String, field_id: String },
    #[error("invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Workflow {
    /// Parse a workflow blob under the default [`Limits`].
    pub fn from_json(blob: &str) -> Result<Workflow, LoadError> {
        Self::from_json_bounded(blob, &Limits::default())
    }

    /// Parse a workflow blob, enforcing the given bounds.
    pub fn from_json_bounded(blob: &str, limits: &Limits) -> Result<Workflow, LoadError> {
        if blob.len() > limits.max_blob_bytes {
            return Err(LoadError::BlobTooLarge {
                actual: blob.len(),
                limit: limits.max_blob_bytes,
            });
        }

        let workflow: Workflow = serde_json::from_str(blob)?;
        workflow.check_bounds(limits)?;
        Ok(workflow)
    }

    /// Re-check bounds on an already-parsed workflow (used for blobs that
    /// arrive as structured values rather than text).
    pub fn check_bounds(&self, limits: &Limits) -> Result<(), LoadError> {
        if self.nodes.len() > limits.max_nodes {
            return Err(LoadError::TooManyNodes {
                actual: self.nodes.len(),
                limit: limits.max_nodes,
            });
        }
        if self.connections.len() > limits.max_connections {
            return Err(LoadError::TooManyConnections {
                actual: self.connections.len(),
                limit: limits.max_connections,
            });
        }
        for (id, node) in &self.nodes {
            if id.as_str().len() > limits.max_identifier_len {
                return Err(LoadError::IdentifierTooLong(id.to_string()));
            }
            if node.node_type.len() > limits.max_identifier_len {
                return Err(LoadError::IdentifierTooLong(node.node_type.clone()));
            }
            // The map key is authoritative; a divergent embedded id would
            // let one node answer to two names.
            if &node.id != id {
                return Err(LoadError::NodeIdMismatch {
                    id: id.to_string(),
                    field_id: node.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Serialize back to a canonical JSON blob.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Content hash of a workflow blob (hex sha256), carried on jobs and
/// checkpoints to detect blob drift between submission and resume.
pub fn blob_hash(blob: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(blob.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
