// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only activity logs, one file per entity.
//!
//! Dispatch decisions, schedule fires, robot lifecycle, and forwarded
//! robot log lines land here as plain text for `tail -f` debugging.

use std::io::Write;
use std::path::PathBuf;

pub struct ActivityLogger {
    log_dir: PathBuf,
}

impl ActivityLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into() }
    }

    /// Append one line to `<log_dir>/<entity>.log`. Logging failures are
    /// reported but never propagate.
    pub fn append(&self, entity: &str, line: &str) {
        let Some(name) = sanitize(entity) else {
            tracing::warn!(entity, "refusing to log under unsafe entity name");
            return;
        };
        if let Err(e) = self.append_inner(&name, line) {
            tracing::warn!(entity, error = %e, "activity log write failed");
        }
    }

    fn append_inner(&self, name: &str, line: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.log_dir)?;
        let path = self.log_dir.join(format!("{name}.log"));
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        writeln!(file, "{now_ms} {line}")
    }

    /// Read the last `lines` lines of an entity's log (0 = all).
    pub fn tail(&self, entity: &str, lines: usize) -> Vec<String> {
        let Some(name) = sanitize(entity) else {
            return Vec::new();
        };
        let path = self.log_dir.join(format!("{name}.log"));
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        let all: Vec<String> = content.lines().map(str::to_string).collect();
        if lines == 0 || all.len() <= lines {
            all
        } else {
            all[all.len() - lines..].to_vec()
        }
    }
}

/// Entity names become file names: letters, digits, `-`, `_` only.
fn sanitize(entity: &str) -> Option<String> {
    if entity.is_empty() || entity.len() > 128 {
        return None;
    }
    if entity.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Some(entity.to_string())
    } else {
        None
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
