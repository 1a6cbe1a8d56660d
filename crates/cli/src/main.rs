// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wmb`: the installer-style CLI entry point — `--install | --uninstall
//! | --test`, plus `--dry-run`, `--quiet`, `--force` — plus a `daemon`
//! subcommand for control-socket interaction. Everything here is a thin
//! client over [`wmb_daemon`] and [`wmb_wire`], never a reimplementation
//! of the core pipeline.

mod client;
mod commands;
mod exit_error;
mod install;

use clap::{ArgGroup, Parser};

use exit_error::ExitError;
use install::InstallFlags;

#[derive(Parser)]
#[command(
    name = "wmb",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "WinDbg MCP bridge daemon: installer and control CLI",
    group(ArgGroup::new("action").args(["install", "uninstall", "test"]).multiple(false))
)]
struct Cli {
    /// Write the MCP tool-registration manifest for this daemon.
    #[arg(long)]
    install: bool,

    /// Remove the MCP tool-registration manifest.
    #[arg(long)]
    uninstall: bool,

    /// Run a connectivity smoke test against a running daemon.
    #[arg(long = "test")]
    test: bool,

    /// Describe what would happen without making changes.
    #[arg(long)]
    dry_run: bool,

    /// Suppress non-error output.
    #[arg(long)]
    quiet: bool,

    /// Overwrite an existing installation.
    #[arg(long)]
    force: bool,

    #[command(subcommand)]
    command: Option<TopCommand>,
}

#[derive(clap::Subcommand)]
enum TopCommand {
    /// Daemon lifecycle and ad-hoc command control.
    Daemon {
        #[command(subcommand)]
        command: commands::DaemonCommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(dispatch(cli));
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
}

async fn dispatch(cli: Cli) -> Result<(), ExitError> {
    let flags = InstallFlags { dry_run: cli.dry_run, quiet: cli.quiet, force: cli.force };

    if cli.install {
        return install::install(flags);
    }
    if cli.uninstall {
        return install::uninstall(flags);
    }
    if cli.test {
        return install::run_test(flags).await;
    }

    match cli.command {
        Some(TopCommand::Daemon { command }) => commands::run(command).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}
