// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `windbgmcpd`: the bridge daemon binary entry point.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wmb_daemon::{lifecycle, listener, maintenance, BridgeConfig};

fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::load()?;
    let _log_guard = init_logging(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config))
}

fn init_logging(config: &BridgeConfig) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.state_dir, "daemon.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting windbgmcpd");

    let startup_result = lifecycle::startup(config).await?;
    let lifecycle::StartupResult { mut daemon, listener: unix_listener } = startup_result;

    let shutdown = Arc::new(Notify::new());
    let listen_ctx = Arc::new(listener::ListenCtx {
        context: Arc::clone(&daemon.context),
        start_time: daemon.start_time,
        shutdown: Arc::clone(&shutdown),
    });

    let control = listener::Listener::new(unix_listener, listen_ctx);
    let control_task = tokio::spawn(control.run(Arc::clone(&shutdown)));
    let maintenance_task = tokio::spawn(maintenance::run(Arc::clone(&daemon.context), Arc::clone(&shutdown)));

    info!("windbgmcpd ready");
    wait_for_shutdown_signal(&shutdown).await;

    shutdown.notify_waiters();
    if let Err(e) = control_task.await {
        error!(error = %e, "control listener task panicked");
    }
    if let Err(e) = maintenance_task.await {
        error!(error = %e, "maintenance task panicked");
    }

    daemon.shutdown().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(shutdown: &Notify) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = shutdown.notified() => info!("shutdown requested over control socket"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(shutdown: &Notify) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
        _ = shutdown.notified() => info!("shutdown requested over control socket"),
    }
}
