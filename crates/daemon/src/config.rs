// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BridgeConfig`: an explicit configuration value passed around rather
//! than a module-level singleton. Assembled once at startup from defaults,
//! environment variables, and an optional TOML override file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wmb_core::DebuggingMode;

use crate::lifecycle::LifecycleError;

/// Default buffer size for the transport's message framing (§6).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub cap_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let defaults = wmb_engine::RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            cap_delay_ms: defaults.cap_delay.as_millis() as u64,
            exponential_backoff: defaults.exponential_backoff,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> wmb_engine::RetryPolicy {
        wmb_engine::RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            cap_delay: Duration::from_millis(self.cap_delay_ms),
            exponential_backoff: self.exponential_backoff,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Kept for configuration-surface parity; the cache crate's own
    /// `COMPRESSION_THRESHOLD_BYTES` constant already matches the default
    /// (10 KiB), so this is currently informational only — see DESIGN.md
    /// for why it isn't threaded further yet.
    pub compress_threshold_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: wmb_cache::DEFAULT_MAX_SIZE, compress_threshold_bytes: 10 * 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub snapshot_file: PathBuf,
    pub max_state_age_s: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            snapshot_file: PathBuf::from("session_snapshot.json"),
            max_state_age_s: wmb_cache::DEFAULT_MAX_STATE_AGE.as_secs(),
        }
    }
}

/// The full set of §6 "Configuration options recognized", plus the state
/// directory and endpoint name resolved by [`crate::env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint_name: String,
    pub buffer_size: usize,
    pub default_timeout_ms: u64,
    pub debugging_mode: DebuggingMode,
    pub pool_max_connections: usize,
    pub pool_max_concurrent_requests: usize,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,

    #[serde(skip)]
    pub state_dir: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint_name: default_endpoint_name(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            default_timeout_ms: 30_000,
            debugging_mode: DebuggingMode::Local,
            pool_max_connections: 5,
            pool_max_concurrent_requests: 10,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            state_dir: PathBuf::new(),
        }
    }
}

/// Platform-dependent default transport endpoint: a named pipe on
/// Windows, a Unix domain socket path elsewhere.
#[cfg(target_os = "windows")]
fn default_endpoint_name() -> String {
    r"\\.\pipe\windbgmcp".to_string()
}

#[cfg(not(target_os = "windows"))]
fn default_endpoint_name() -> String {
    "bridge.sock".to_string()
}

impl BridgeConfig {
    /// Load defaults, apply an optional TOML override file
    /// (`WMB_CONFIG_FILE`), then resolve paths relative to the state
    /// directory.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        let mut config = Self { state_dir: state_dir.clone(), ..Self::default() };

        if let Some(path) = crate::env::config_file() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| LifecycleError::ConfigRead(path.clone(), e))?;
            let overrides: BridgeConfigFile = toml::from_str(&text)
                .map_err(|e| LifecycleError::ConfigParse(path.clone(), e))?;
            overrides.apply(&mut config);
        }

        if !config.session.snapshot_file.is_absolute() {
            config.session.snapshot_file = state_dir.join(&config.session.snapshot_file);
        }
        if !Self::endpoint_is_platform_name(&config.endpoint_name) {
            config.endpoint_name = state_dir.join(&config.endpoint_name).to_string_lossy().into_owned();
        }

        Ok(config)
    }

    #[cfg(target_os = "windows")]
    fn endpoint_is_platform_name(name: &str) -> bool {
        name.starts_with(r"\\.\pipe\")
    }

    #[cfg(not(target_os = "windows"))]
    fn endpoint_is_platform_name(name: &str) -> bool {
        PathBuf::from(name).is_absolute()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn pool_max_age(&self) -> Duration {
        Duration::from_secs(300)
    }
}

/// Partial TOML override shape: every field optional so a deployer's config
/// file only needs to name what it changes.
#[derive(Debug, Clone, Default, Deserialize)]
struct BridgeConfigFile {
    endpoint_name: Option<String>,
    buffer_size: Option<usize>,
    default_timeout_ms: Option<u64>,
    debugging_mode: Option<DebuggingMode>,
    pool_max_connections: Option<usize>,
    pool_max_concurrent_requests: Option<usize>,
    retry: Option<RetryConfigFile>,
    cache: Option<CacheConfigFile>,
    session: Option<SessionConfigFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RetryConfigFile {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    cap_delay_ms: Option<u64>,
    exponential_backoff: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CacheConfigFile {
    max_entries: Option<usize>,
    compress_threshold_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionConfigFile {
    snapshot_file: Option<PathBuf>,
    max_state_age_s: Option<u64>,
}

impl BridgeConfigFile {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(v) = self.endpoint_name {
            config.endpoint_name = v;
        }
        if let Some(v) = self.buffer_size {
            config.buffer_size = v;
        }
        if let Some(v) = self.default_timeout_ms {
            config.default_timeout_ms = v;
        }
        if let Some(v) = self.debugging_mode {
            config.debugging_mode = v;
        }
        if let Some(v) = self.pool_max_connections {
            config.pool_max_connections = v;
        }
        if let Some(v) = self.pool_max_concurrent_requests {
            config.pool_max_concurrent_requests = v;
        }
        if let Some(r) = self.retry {
            if let Some(v) = r.max_attempts {
                config.retry.max_attempts = v;
            }
            if let Some(v) = r.base_delay_ms {
                config.retry.base_delay_ms = v;
            }
            if let Some(v) = r.cap_delay_ms {
                config.retry.cap_delay_ms = v;
            }
            if let Some(v) = r.exponential_backoff {
                config.retry.exponential_backoff = v;
            }
        }
        if let Some(c) = self.cache {
            if let Some(v) = c.max_entries {
                config.cache.max_entries = v;
            }
            if let Some(v) = c.compress_threshold_bytes {
                config.cache.compress_threshold_bytes = v;
            }
        }
        if let Some(s) = self.session {
            if let Some(v) = s.snapshot_file {
                config.session.snapshot_file = v;
            }
            if let Some(v) = s.max_state_age_s {
                config.session.max_state_age_s = v;
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
