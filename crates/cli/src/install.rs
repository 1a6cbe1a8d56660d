// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The installer-style surface: one entry point accepting
//! `--install | --uninstall | --test`, plus `--dry-run`, `--quiet`,
//! `--force`. This is deliberately a thin front end — it writes one small
//! MCP tool-registration file and otherwise defers to
//! [`crate::client::DaemonClient`] for anything that talks to a running
//! daemon.

use std::path::PathBuf;

use serde::Serialize;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;

/// Shared flags for every installer action (§6).
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallFlags {
    pub dry_run: bool,
    pub quiet: bool,
    pub force: bool,
}

/// The tool-registration descriptor an MCP-aware agent host would read to
/// discover this bridge. Deliberately minimal — the MCP tool surface that
/// *consumes* this file is out of scope (§1); only its presence and
/// contents are this CLI's concern.
#[derive(Debug, Serialize)]
struct ToolManifest {
    name: &'static str,
    version: &'static str,
    command: String,
    transport: &'static str,
}

fn manifest_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("mcp_tool.json")
}

fn daemon_binary_path() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("windbgmcpd")))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "windbgmcpd".to_string())
}

pub fn install(flags: InstallFlags) -> Result<(), ExitError> {
    let state_dir = wmb_daemon::env::state_dir().map_err(|_| ExitError::failure("could not determine state directory"))?;
    let path = manifest_path(&state_dir);

    if path.exists() && !flags.force {
        if !flags.quiet {
            println!("already installed at {} (use --force to overwrite)", path.display());
        }
        return Ok(());
    }

    let manifest = ToolManifest {
        name: "windbg-mcp-bridge",
        version: env!("CARGO_PKG_VERSION"),
        command: daemon_binary_path(),
        transport: "stdio-control-socket",
    };
    let body = serde_json::to_string_pretty(&manifest).map_err(|e| ExitError::failure(e.to_string()))?;

    if flags.dry_run {
        if !flags.quiet {
            println!("would write {}:\n{body}", path.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(&state_dir).map_err(|e| ExitError::failure(format!("{}: {e}", state_dir.display())))?;
    std::fs::write(&path, body).map_err(|e| ExitError::failure(format!("{}: {e}", path.display())))?;

    if !flags.quiet {
        println!("installed tool manifest at {}", path.display());
    }
    Ok(())
}

pub fn uninstall(flags: InstallFlags) -> Result<(), ExitError> {
    let state_dir = wmb_daemon::env::state_dir().map_err(|_| ExitError::failure("could not determine state directory"))?;
    let path = manifest_path(&state_dir);

    if !path.exists() {
        if !flags.quiet {
            println!("nothing to uninstall ({} does not exist)", path.display());
        }
        return Ok(());
    }

    if flags.dry_run {
        if !flags.quiet {
            println!("would remove {}", path.display());
        }
        return Ok(());
    }

    std::fs::remove_file(&path).map_err(|e| ExitError::failure(format!("{}: {e}", path.display())))?;
    if !flags.quiet {
        println!("removed {}", path.display());
    }
    Ok(())
}

/// `--test`: a connectivity smoke test against a running daemon. Exits 1
/// (via [`ExitError`]) if the daemon isn't reachable or reports an error,
/// matching §6's exit-code contract.
pub async fn run_test(flags: InstallFlags) -> Result<(), ExitError> {
    let client = DaemonClient::connect().map_err(|e| ExitError::failure(format!("daemon unreachable: {e}")))?;

    let version = client.version().await.map_err(|e| ExitError::failure(format!("version check failed: {e}")))?;
    if !flags.quiet {
        println!("daemon version: {version}");
    }

    let health = client.health_check().await.map_err(|e| ExitError::failure(format!("health check failed: {e}")))?;
    if !flags.quiet {
        println!("health: {}", serde_json::to_string_pretty(&health).unwrap_or_default());
    }

    let probe = client
        .execute_command("version", 5_000)
        .await
        .map_err(|e| ExitError::failure(format!("test command failed: {e}")))?;
    if !flags.quiet {
        println!("test command result: {probe}");
    }

    Ok(())
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
