// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! armadad: the orchestrator daemon.

use armada_orchestrator::{Orchestrator, OrchestratorConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn config_from_env() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    if let Ok(addr) = std::env::var("ARMADA_BIND") {
        config.bind_addr = addr;
    }
    if let Ok(token) = std::env::var("ARMADA_TOKEN") {
        if !token.is_empty() {
            config.auth_token = Some(token);
        }
    }
    if let Ok(dir) = std::env::var("ARMADA_LOG_DIR") {
        config.log_dir = dir.into();
    }
    config
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ARMADA_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env();
    tracing::info!(addr = %config.bind_addr, "starting armadad");

    let orchestrator = Arc::new(Orchestrator::new(config));
    let shutdown = orchestrator.clone().start();

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "signal handler failed"),
    }
    shutdown.cancel();
}
