// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! armada-robot: the worker agent binary.

use armada_durable::{DurableConfig, FileStore};
use armada_engine::NodeRegistry;
use armada_robot::{ClientConfig, JobRunner, RobotClient, RobotConfig};
use armada_core::SystemClock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match RobotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // Setup is an external collaborator; the agent only reports
            // what is missing.
            eprintln!("armada-robot: {e}");
            eprintln!("run the setup flow or set ARMADA_ROBOT_CONFIG");
            std::process::exit(2);
        }
    };

    let level = config.logging.level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("ARMADA_LOG").unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let state_dir = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("armada");
    let store = match FileStore::open(&state_dir, "checkpoints") {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("armada-robot: cannot open checkpoint store: {e}");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(NodeRegistry::with_builtins());
    let runner = Arc::new(JobRunner::new(
        store,
        registry,
        SystemClock,
        DurableConfig::default(),
    ));
    let client = Arc::new(RobotClient::new(
        ClientConfig::from_robot_config(&config),
        runner,
    ));

    tracing::info!(name = %config.robot.name, url = %config.orchestrator.url, "robot starting");

    let shutdown = CancellationToken::new();
    let client_shutdown = shutdown.clone();
    let client_task = tokio::spawn(client.run(client_shutdown));

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "signal handler failed"),
    }
    shutdown.cancel();
    let _ = client_task.await;
}
