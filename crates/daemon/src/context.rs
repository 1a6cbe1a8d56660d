// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles the module graph — transport, cache, resilience, async
//! tasks, executor, context manager, session recovery — from a loaded
//! [`BridgeConfig`].

use std::sync::Arc;

use wmb_cache::{SessionRecovery, UnifiedCache};
use wmb_engine::{AsyncTaskManager, ContextManager, ExecutorSettings, ResilienceMonitor, UnifiedExecutor};
use wmb_transport::{ConnectionPool, UnixSocketTransport};

use crate::config::BridgeConfig;

/// The assembled core: everything the control listener and maintenance
/// loop need to do their work, wired once at startup and shared behind an
/// `Arc` for the rest of the daemon's life.
pub struct CoreContext {
    pub executor: UnifiedExecutor,
    pub context_manager: ContextManager,
    pub session: SessionRecovery,
    pub pool: Arc<ConnectionPool>,
    pub resilience: Arc<ResilienceMonitor>,
}

impl CoreContext {
    pub fn build(config: &BridgeConfig) -> Self {
        let transport = Arc::new(UnixSocketTransport::new(config.endpoint_name.clone()));
        let pool = Arc::new(ConnectionPool::new(
            transport,
            config.pool_max_connections,
            config.pool_max_concurrent_requests,
            config.pool_max_age(),
            config.connect_timeout(),
        ));
        let cache = Arc::new(UnifiedCache::new(config.cache.max_entries));
        let resilience = Arc::new(ResilienceMonitor::new(config.debugging_mode));
        let async_tasks = Arc::new(AsyncTaskManager::new(config.pool_max_concurrent_requests));

        let settings = ExecutorSettings {
            connect_timeout: config.connect_timeout(),
            retry_policy: config.retry.to_policy(),
        };
        let executor =
            UnifiedExecutor::new(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&resilience), async_tasks, settings);

        let session = SessionRecovery::new(Arc::clone(&cache), config.session.snapshot_file.clone())
            .with_max_state_age(std::time::Duration::from_secs(config.session.max_state_age_s));

        Self { executor, context_manager: ContextManager::new(), session, pool, resilience }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
