// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint persistence.
//!
//! The store interface is deliberately small: load, atomic upsert,
//! delete. Identifiers that end up composed into storage paths or
//! statements are validated against a strict allow-list; job ids (which
//! are caller-chosen) never reach a path or statement directly — file
//! names derive from their hash.

use crate::checkpoint::Checkpoint;
use armada_core::JobId;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Validate an identifier used in storage composition (namespace, table
/// name). Must match `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Checkpoint persistence interface.
///
/// `save` must be an atomic upsert with respect to concurrent readers: a
/// reader sees either the previous or the new checkpoint, never a torn
/// write.
pub trait CheckpointStore: Send + Sync {
    fn load(&self, job_id: &JobId) -> Result<Option<Checkpoint>, StoreError>;
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError>;
    fn delete(&self, job_id: &JobId) -> Result<bool, StoreError>;
}

/// In-memory store for tests and single-process runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<JobId, Checkpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl CheckpointStore for MemoryStore {
    fn load(&self, job_id: &JobId) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.inner.lock().get(job_id).cloned())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.inner.lock().insert(checkpoint.job_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn delete(&self, job_id: &JobId) -> Result<bool, StoreError> {
        Ok(self.inner.lock().remove(job_id).is_some())
    }
}

/// One JSON file per job under `<root>/<namespace>/`, written via
/// temp-file + rename so readers never observe a torn checkpoint.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating directories) a store rooted at `root` with a
    /// validated namespace.
    pub fn open(root: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        let namespace = validate_identifier(namespace)?;
        let dir = root.as_ref().join(namespace);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, job_id: &JobId) -> PathBuf {
        // Caller-chosen ids never become path components; their hash does.
        let mut hasher = Sha256::new();
        hasher.update(job_id.as_str().as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(64);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl CheckpointStore for FileStore {
    fn load(&self, job_id: &JobId) -> Result<Option<Checkpoint>, StoreError> {
        let path = self.path_for(job_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let path = self.path_for(&checkpoint.job_id);
        let tmp = path.with_extension("json.tmp");
        let encoded = serde_json::to_vec(checkpoint)?;
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, job_id: &JobId) -> Result<bool, StoreError> {
        let path = self.path_for(job_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
