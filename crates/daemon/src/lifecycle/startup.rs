// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: single-instance locking, state directory setup, session
//! snapshot recovery, control-socket bind.

use std::io::Write;
use std::time::Instant;

use fs2::FileExt;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::context::CoreContext;

use super::{control_socket_path, lock_path, DaemonState, LifecycleError, StartupResult};

/// Run startup, cleaning up any partially-created files if it fails (except
/// when the failure *is* the lock, since those files belong to the
/// already-running daemon).
pub async fn startup(config: BridgeConfig) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config.clone()).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: BridgeConfig) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire the lock before truncating it, so a failed attempt never wipes
    // the running daemon's PID.
    let lock_file =
        std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(lock_path(&config))?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(
        config.state_dir.join("daemon.version"),
        concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    )?;

    let context = std::sync::Arc::new(CoreContext::build(&config));

    match context.session.load_session_state().await {
        Ok(Some(snapshot)) => {
            info!(session_id = %snapshot.session_id, "restored session snapshot from prior run")
        }
        Ok(None) => info!("no prior session snapshot found"),
        Err(e) => warn!(error = %e, "failed to load session snapshot, starting fresh"),
    }

    let socket_path = control_socket_path(&config);
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let listener = UnixListener::bind(&socket_path)
        .map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;

    let daemon = DaemonState { config, lock_file, context, start_time: Instant::now() };
    Ok(StartupResult { daemon, listener })
}

fn cleanup_on_failure(config: &BridgeConfig) {
    let socket_path = control_socket_path(config);
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    let version_path = config.state_dir.join("daemon.version");
    if version_path.exists() {
        let _ = std::fs::remove_file(&version_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
