// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that every turn controller monitors. Controllers
//! abandon in-flight model streams and close their connections.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal(&token_clone).await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal(token: &CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C will stop the server");
            None
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        _ = async {
            match sigterm.as_mut() {
                Some(s) => { s.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => info!("received SIGTERM, initiating shutdown"),
        _ = token.cancelled() => debug!("shutdown requested programmatically"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal(token: &CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, initiating shutdown"),
        _ = token.cancelled() => debug!("shutdown requested programmatically"),
    }
}

/// Waits up to `timeout` for the tracked connection tasks to finish.
///
/// Returns `true` when every task finished in time.
pub async fn drain_connections(tracker: &TaskTracker, timeout: Duration) -> bool {
    tracker.close();
    if tracker.is_empty() {
        info!("no active connections to drain");
        return true;
    }

    info!(count = tracker.len(), "waiting for active connections to close");
    match tokio::time::timeout(timeout, tracker.wait()).await {
        Ok(()) => {
            info!("all connections drained");
            true
        }
        Err(_) => {
            warn!(remaining = tracker.len(), "timeout reached, some connections interrupted");
            false
        }
    }
}
