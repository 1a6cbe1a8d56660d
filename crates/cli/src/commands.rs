// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wmb daemon ...` — daemon lifecycle and ad-hoc command control.
//! Distinct from the installer-style `--install`/`--uninstall`/`--test`
//! flags in [`crate::install`].

use std::path::PathBuf;
use std::process::Command;

use anyhow::anyhow;
use clap::Subcommand;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background if it isn't already running.
    Start,
    /// Stop a running daemon over the control socket.
    Stop,
    /// Report uptime and resilience-monitor health (§4.11).
    Status,
    /// Print the daemon's version and build hash.
    Version,
    /// Send one debugger command through the full pipeline and print the
    /// result (a manual escape hatch distinct from `--test`'s fixed probe).
    Exec {
        command: String,
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
}

pub async fn run(command: DaemonCommand) -> Result<(), ExitError> {
    match command {
        DaemonCommand::Start => start().await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Status => status().await,
        DaemonCommand::Version => version().await,
        DaemonCommand::Exec { command, timeout_ms } => exec(command, timeout_ms).await,
    }
}

async fn start() -> Result<(), ExitError> {
    if DaemonClient::connect().is_ok() {
        println!("daemon already running");
        return Ok(());
    }

    let binary = find_daemon_binary().map_err(|e| ExitError::failure(e.to_string()))?;
    Command::new(&binary).spawn().map_err(|e| ExitError::failure(format!("failed to start {}: {e}", binary.display())))?;

    // Give the new process a moment to bind the control socket before the
    // caller's next command tries to use it.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    println!("daemon started");
    Ok(())
}

async fn stop() -> Result<(), ExitError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => {
            println!("daemon not running");
            return Ok(());
        }
    };
    client.shutdown().await.map_err(|e| ExitError::failure(e.to_string()))?;
    println!("daemon stopped");
    Ok(())
}

async fn status() -> Result<(), ExitError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => {
            println!("status: not running");
            return Ok(());
        }
    };
    let health = client.health_check().await.map_err(|e| ExitError::failure(e.to_string()))?;
    println!("status: running");
    println!("{}", serde_json::to_string_pretty(&health).unwrap_or_default());
    Ok(())
}

async fn version() -> Result<(), ExitError> {
    match DaemonClient::connect() {
        Ok(client) => {
            let v = client.version().await.map_err(|e| ExitError::failure(e.to_string()))?;
            println!("windbgmcpd {v}");
        }
        Err(_) => println!("daemon not running (cli {})", env!("CARGO_PKG_VERSION")),
    }
    Ok(())
}

async fn exec(command: String, timeout_ms: u64) -> Result<(), ExitError> {
    let client = DaemonClient::connect().map_err(|e| ExitError::failure(format!("daemon unreachable: {e}")))?;
    let result = client
        .execute_command(&command, timeout_ms)
        .await
        .map_err(|e| ExitError::failure(e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(())
}

fn find_daemon_binary() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.to_path_buf())) {
        let sibling = dir.join("windbgmcpd");
        if sibling.exists() {
            return Ok(sibling);
        }
    }
    which_on_path("windbgmcpd").ok_or_else(|| anyhow!("windbgmcpd not found next to wmb or on PATH"))
}

fn which_on_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).map(|dir| dir.join(binary)).find(|candidate| candidate.exists())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
