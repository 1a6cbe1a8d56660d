// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background maintenance loop: periodic stale-connection eviction (§4.3)
//! and session-snapshot persistence (§4.10), run at
//! [`crate::env::maintenance_interval`].

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::context::CoreContext;

pub async fn run(context: Arc<CoreContext>, shutdown: Arc<Notify>) {
    let interval = crate::env::maintenance_interval();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&context).await,
            _ = shutdown.notified() => {
                debug!("maintenance loop stopping");
                return;
            }
        }
    }
}

async fn sweep(context: &CoreContext) {
    context.pool.evict_stale();
    match context.session.save_session_state().await {
        Ok(true) => debug!("maintenance sweep: persisted session snapshot"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "maintenance sweep: failed to persist session snapshot"),
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
