// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-run configuration envelope.
//!
//! Read from `~/.config/armada/robot.toml` (overridable via
//! `ARMADA_ROBOT_CONFIG`). A missing or malformed file surfaces as
//! [`ConfigError::SetupRequired`] so a setup flow can take over; this
//! crate never writes the file itself.

use armada_core::{Capability, Environment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration missing or incomplete at {path}: {reason}")]
    SetupRequired { path: PathBuf, reason: String },
    #[error("configuration unreadable: {0}")]
    Io(#[from] std::io::Error),
}

/// `[orchestrator]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSection {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// `[robot]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotSection {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_max_jobs")]
    pub max_concurrent_jobs: u32,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_max_jobs() -> u32 {
    1
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
}

/// The whole config envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    pub orchestrator: OrchestratorSection,
    pub robot: RobotSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl RobotConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("ARMADA_ROBOT_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("armada")
            .join("robot.toml")
    }

    /// Load and validate from the default location.
    pub fn load() -> Result<RobotConfig, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load and validate from an explicit path.
    pub fn load_from(path: &Path) -> Result<RobotConfig, ConfigError> {
        let setup = |reason: String| ConfigError::SetupRequired {
            path: path.to_path_buf(),
            reason,
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(setup("config file does not exist".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let config: RobotConfig =
            toml::from_str(&text).map_err(|e| setup(format!("parse error: {e}")))?;
        config.validate().map_err(setup)?;
        Ok(config)
    }

    /// Parse and validate from TOML text.
    pub fn from_toml(text: &str) -> Result<RobotConfig, String> {
        let config: RobotConfig = toml::from_str(text).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.orchestrator.url.is_empty() {
            return Err("orchestrator.url is empty".to_string());
        }
        if !self.orchestrator.url.starts_with("ws://") && !self.orchestrator.url.starts_with("wss://")
        {
            return Err(format!(
                "orchestrator.url must be a ws:// or wss:// url, got '{}'",
                self.orchestrator.url
            ));
        }
        if self.robot.name.is_empty() {
            return Err("robot.name is empty".to_string());
        }
        if self.robot.max_concurrent_jobs == 0 {
            return Err("robot.max_concurrent_jobs must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
