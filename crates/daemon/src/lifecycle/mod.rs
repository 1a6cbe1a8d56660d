// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, single-instance locking.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::context::CoreContext;

/// Daemon state during operation.
///
/// `lock_file` is held only to maintain the exclusive `fs2` lock across the
/// daemon's lifetime; it is released on drop.
pub struct DaemonState {
    pub config: BridgeConfig,
    #[allow(dead_code)]
    lock_file: File,
    pub context: Arc<CoreContext>,
    pub start_time: Instant,
}

/// Result of daemon startup: the state plus the control-socket listener to
/// be driven by [`crate::listener::Listener`].
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shut down gracefully: persist the session snapshot, then remove the
    /// control socket and version file. The lock file is released when
    /// `self.lock_file` drops at the end of `main`.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        match self.context.session.save_session_state().await {
            Ok(true) => info!("persisted session snapshot on shutdown"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "failed to persist session snapshot on shutdown"),
        }

        let socket_path = control_socket_path(&self.config);
        if socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&socket_path) {
                warn!(error = %e, "failed to remove control socket");
            }
        }

        let version_path = self.config.state_dir.join("daemon.version");
        if version_path.exists() {
            if let Err(e) = std::fs::remove_file(&version_path) {
                warn!(error = %e, "failed to remove version file");
            }
        }

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Path to the daemon's own control-socket file (distinct from
/// `config.endpoint_name`, which is the *outbound* debugger endpoint).
pub(crate) fn control_socket_path(config: &BridgeConfig) -> PathBuf {
    config.state_dir.join("control.sock")
}

pub(crate) fn lock_path(config: &BridgeConfig) -> PathBuf {
    config.state_dir.join("daemon.pid")
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind control socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("failed to read config file {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ConfigParse(PathBuf, toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
