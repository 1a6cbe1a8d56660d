// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve the state directory: `WMB_STATE_DIR` > `XDG_STATE_HOME/windbgmcp`
/// > `~/.local/state/windbgmcp`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("WMB_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("windbgmcp"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/windbgmcp"))
}

/// Optional path to a TOML config file overriding [`crate::config::BridgeConfig`]
/// defaults and environment values.
pub fn config_file() -> Option<PathBuf> {
    std::env::var("WMB_CONFIG_FILE").ok().map(PathBuf::from)
}

/// Timeout for a single read/write on the control listener (§6's
/// "default timeout" applied to the daemon's own request handling, distinct
/// from the per-command `default_timeout_ms` resolved per §4.5).
pub fn control_io_timeout() -> Duration {
    std::env::var("WMB_CONTROL_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Interval at which the maintenance loop sweeps the connection pool for
/// stale handles and probes resilience health (§4.11: "a coarse interval,
/// e.g. 30s").
pub fn maintenance_interval() -> Duration {
    std::env::var("WMB_MAINTENANCE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(wmb_engine::HEALTH_PROBE_INTERVAL)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
