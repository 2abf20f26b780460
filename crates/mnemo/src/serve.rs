// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo serve` command implementation.
//!
//! Opens the shared SQLite database, wires the conversation store, vector
//! index, long-term memory and knowledge bases, connects the chat model,
//! and runs the gateway until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use mnemo_agent::shutdown;
use mnemo_config::model::MnemoConfig;
use mnemo_core::{MnemoError, PluginAdapter};
use mnemo_gateway::GatewayState;
use mnemo_openai::OpenAiModel;
use mnemo_storage::Database;
use tracing::{info, warn};

/// How long open connections get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the `mnemo serve` command.
pub async fn run_serve(config: MnemoConfig) -> Result<(), MnemoError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting mnemo serve");

    let database = Database::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "database opened");

    let model = Arc::new(OpenAiModel::from_config(&config.model)?);
    info!(adapter = model.name(), "model adapter ready");

    let cancel = shutdown::install_signal_handler();
    let state = GatewayState::assemble(&config, database.clone(), model, cancel)?;
    let connections = state.connections.clone();

    mnemo_gateway::start_server(&config.gateway.host, config.gateway.port, state).await?;

    if !shutdown::drain_connections(&connections, DRAIN_TIMEOUT).await {
        warn!("shutting down with connections still open");
    }
    if let Err(e) = database.checkpoint().await {
        warn!(error = %e, "final WAL checkpoint failed");
    }

    info!("mnemo stopped");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
