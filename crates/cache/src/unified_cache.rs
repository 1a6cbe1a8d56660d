// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Unified Cache (§4.8): one capacity-bounded map shared across the
//! startup, command, session, and performance contexts, with per-context and
//! per-command TTLs, priority-weighted LRU eviction, and opportunistic
//! compression of large payloads.
//!
//! Grounded in `original_source/mcp_server/core/unified_cache.py`'s
//! `UnifiedCache`, translated from a single global `threading.Lock` +
//! `OrderedDict` to a `parking_lot::Mutex`-guarded `IndexMap`-like structure
//! (here, an insertion-ordered `Vec` of keys alongside a `HashMap`, since the
//! access patterns are small and the move-to-MRU-end operation mirrors
//! `OrderedDict.move_to_end` directly).

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use wmb_core::{CacheContext, Priority};

/// Default cache capacity, matching the original's `UnifiedCache(max_size=500)`.
pub const DEFAULT_MAX_SIZE: usize = 500;

/// Compress payloads larger than this many bytes.
const COMPRESSION_THRESHOLD_BYTES: usize = 10 * 1024;

/// Only keep a compressed payload if it saves at least this fraction of size.
const COMPRESSION_MIN_SAVINGS: f64 = 0.20;

fn default_ttl(context: CacheContext) -> Duration {
    match context {
        CacheContext::Startup => Duration::ZERO,
        CacheContext::Command => Duration::from_secs(300),
        CacheContext::Session => Duration::from_secs(30),
        CacheContext::Performance => Duration::from_secs(600),
    }
}

/// Per-command TTL overrides for the command context, checked by substring
/// match against the lowercased, trimmed command (first match wins, in
/// iteration order) — matches `_command_ttls` in the original.
const COMMAND_TTL_OVERRIDES: &[(&str, u64)] = &[
    ("version", 1800),
    ("lm", 900),
    (".effmach", 1800),
    ("!pcr", 600),
    ("vertarget", 300),
    ("r", 5),
    ("k", 30),
    ("!thread", 60),
    ("bl", 120),
];

fn command_ttl_override(command: &str) -> Option<Duration> {
    let lowered = command.to_lowercase();
    COMMAND_TTL_OVERRIDES
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, secs)| Duration::from_secs(*secs))
}

struct Entry {
    context: CacheContext,
    command: Option<String>,
    data: Vec<u8>,
    compressed: bool,
    data_size: usize,
    created_at: Instant,
    last_access: Instant,
    ttl: Duration,
    access_count: u64,
    priority: Priority,
}

impl Entry {
    fn is_expired(&self, context: CacheContext) -> bool {
        if context == CacheContext::Startup {
            return false;
        }
        self.created_at.elapsed() > self.ttl
    }
}

/// Stable cache key: sha256 hex digest of the JSON-normalized
/// `{base, context, extra}` triple, mirroring `_generate_key`'s
/// `hashlib.md5(json.dumps(key_data, sort_keys=True))`.
fn generate_key(base: &str, context: CacheContext, extra: Option<&serde_json::Value>) -> String {
    let mut key_data = serde_json::json!({
        "base": base.trim().to_lowercase(),
        "context": context.as_str(),
    });
    if let Some(extra) = extra {
        key_data["extra"] = extra.clone();
    }
    // sort_keys=True in the original; serde_json's Map is already a BTreeMap
    // by default, so to_string already emits keys in sorted order.
    let canonical = key_data.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{:x}", digest)
}

fn compress(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() <= COMPRESSION_THRESHOLD_BYTES {
        return None;
    }
    let compressed = zstd::encode_all(data, 0).ok()?;
    let savings = 1.0 - (compressed.len() as f64 / data.len() as f64);
    if savings >= COMPRESSION_MIN_SAVINGS {
        Some(compressed)
    } else {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to decompress cached payload")]
    Decompress,
}

/// A single map shared across the startup/command/session/performance
/// contexts (§4.8). Capacity-bounded; evicts by lowest-priority-then-LRU.
pub struct UnifiedCache {
    max_size: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Insertion/access order, oldest-first; `move_to_mru` relocates a key
    /// to the back on every `get`, mirroring `OrderedDict.move_to_end`.
    order: Vec<String>,
    entries: HashMap<String, Entry>,
    startup_active: bool,
}

impl Default for UnifiedCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl UnifiedCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(Inner { order: Vec::new(), entries: HashMap::new(), startup_active: false }),
        }
    }

    pub fn start_startup_caching(&self) {
        self.inner.lock().startup_active = true;
    }

    /// Disables startup caching and clears all startup-context entries,
    /// returning the number removed.
    pub fn stop_startup_caching(&self) -> usize {
        let removed = self.clear_context(CacheContext::Startup);
        self.inner.lock().startup_active = false;
        removed
    }

    /// Fetch a raw byte payload, decompressing if it was stored compressed.
    /// Returns `None` on miss or expiry; touches access bookkeeping and
    /// moves the entry to the MRU end on hit.
    pub fn get(
        &self,
        base: &str,
        context: CacheContext,
        extra: Option<&serde_json::Value>,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let key = generate_key(base, context, extra);
        let mut inner = self.inner.lock();

        if inner.entries.get(&key).is_some_and(|e| e.is_expired(context)) {
            inner.entries.remove(&key);
            inner.order.retain(|k| k != &key);
            return Ok(None);
        }

        let Some(entry) = inner.entries.get_mut(&key) else {
            return Ok(None);
        };
        entry.access_count += 1;
        entry.last_access = Instant::now();
        let compressed = entry.compressed;
        let data = entry.data.clone();

        inner.order.retain(|k| k != &key);
        inner.order.push(key);

        drop(inner);
        if compressed {
            let decompressed = zstd::decode_all(data.as_slice()).map_err(|_| CacheError::Decompress)?;
            Ok(Some(decompressed))
        } else {
            Ok(Some(data))
        }
    }

    /// Store a raw byte payload under `(base, context, extra)`. A `None` ttl
    /// falls back to the context/command default. Returns `false` for a
    /// silently-skipped startup write when startup caching is inactive,
    /// matching the original's no-op behavior.
    pub fn put(
        &self,
        base: &str,
        data: &[u8],
        context: CacheContext,
        extra: Option<&serde_json::Value>,
        ttl: Option<Duration>,
        priority: Priority,
    ) -> bool {
        let mut inner = self.inner.lock();
        if context == CacheContext::Startup && !inner.startup_active {
            return false;
        }

        self.evict_if_needed(&mut inner);

        let ttl = ttl.unwrap_or_else(|| {
            if context == CacheContext::Command {
                command_ttl_override(base).unwrap_or_else(|| default_ttl(context))
            } else {
                default_ttl(context)
            }
        });

        let (stored, compressed) = match compress(data) {
            Some(z) => (z, true),
            None => (data.to_vec(), false),
        };

        let key = generate_key(base, context, extra);
        let now = Instant::now();
        inner.order.retain(|k| k != &key);
        inner.order.push(key.clone());
        inner.entries.insert(
            key,
            Entry {
                context,
                command: Some(base.to_string()),
                data: stored,
                compressed,
                data_size: data.len(),
                created_at: now,
                last_access: now,
                ttl,
                access_count: 0,
                priority,
            },
        );
        true
    }

    fn evict_if_needed(&self, inner: &mut Inner) {
        while inner.entries.len() >= self.max_size {
            let victim = inner
                .order
                .iter()
                .filter_map(|key| inner.entries.get(key).map(|e| (key.clone(), e.priority, e.last_access)))
                .min_by(|(_, pa, la), (_, pb, lb)| pa.cmp(pb).then(la.cmp(lb)))
                .map(|(key, _, _)| key);
            let Some(victim) = victim else { break };
            inner.entries.remove(&victim);
            inner.order.retain(|k| k != &victim);
        }
    }

    /// Remove entries matching a command, a context, or a substring pattern
    /// against the stored command; at least one of the three must be given.
    /// Returns the count removed.
    pub fn invalidate(&self, command: Option<&str>, context: Option<CacheContext>, pattern: Option<&str>) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| {
                command.is_some_and(|c| e.command.as_deref() == Some(c))
                    || context.is_some_and(|ctx| e.context == ctx)
                    || pattern.is_some_and(|p| {
                        e.command.as_deref().unwrap_or_default().to_lowercase().contains(&p.to_lowercase())
                    })
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in &doomed {
            inner.entries.remove(key);
        }
        inner.order.retain(|k| !doomed.contains(k));
        doomed.len()
    }

    pub fn clear_context(&self, context: CacheContext) -> usize {
        self.invalidate(None, Some(context), None)
    }

    pub fn clear_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        count
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut by_context: HashMap<CacheContext, ContextStats> = HashMap::new();
        let mut total_size = 0usize;
        let mut total_compressed = 0usize;

        for entry in inner.entries.values() {
            let ctx_stats = by_context.entry(entry.context).or_default();
            ctx_stats.count += 1;
            ctx_stats.size += entry.data_size;
            if entry.compressed {
                ctx_stats.compressed += 1;
                total_compressed += 1;
            }
            total_size += entry.data_size;
        }

        CacheStats {
            total_entries: inner.entries.len(),
            max_size: self.max_size,
            total_data_size: total_size,
            total_compressed,
            by_context,
            startup_active: inner.startup_active,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextStats {
    pub count: usize,
    pub size: usize,
    pub compressed: usize,
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub max_size: usize,
    pub total_data_size: usize,
    pub total_compressed: usize,
    pub by_context: HashMap<CacheContext, ContextStats>,
    pub startup_active: bool,
}

#[cfg(test)]
#[path = "unified_cache_tests.rs"]
mod tests;
