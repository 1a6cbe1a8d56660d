// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wmb_core::{CacheContext, Priority};
use yare::parameterized;

#[test]
fn miss_returns_none() {
    let cache = UnifiedCache::new(10);
    assert_eq!(cache.get("version", CacheContext::Command, None).unwrap(), None);
}

#[test]
fn put_then_get_round_trips() {
    let cache = UnifiedCache::new(10);
    assert!(cache.put("lm", b"module list", CacheContext::Command, None, None, Priority::Normal));
    let got = cache.get("lm", CacheContext::Command, None).unwrap();
    assert_eq!(got, Some(b"module list".to_vec()));
}

#[test]
fn key_is_case_and_whitespace_insensitive_on_base() {
    let cache = UnifiedCache::new(10);
    cache.put(" Version ", b"1.0", CacheContext::Command, None, None, Priority::Normal);
    let got = cache.get("version", CacheContext::Command, None).unwrap();
    assert_eq!(got, Some(b"1.0".to_vec()));
}

#[test]
fn extra_context_changes_the_key() {
    let cache = UnifiedCache::new(10);
    let extra_a = serde_json::json!({"pid": 1});
    let extra_b = serde_json::json!({"pid": 2});
    cache.put("!process", b"a", CacheContext::Command, Some(&extra_a), None, Priority::Normal);
    cache.put("!process", b"b", CacheContext::Command, Some(&extra_b), None, Priority::Normal);

    assert_eq!(cache.get("!process", CacheContext::Command, Some(&extra_a)).unwrap(), Some(b"a".to_vec()));
    assert_eq!(cache.get("!process", CacheContext::Command, Some(&extra_b)).unwrap(), Some(b"b".to_vec()));
}

#[test]
fn startup_context_is_a_no_op_until_caching_starts() {
    let cache = UnifiedCache::new(10);
    assert!(!cache.put("init", b"x", CacheContext::Startup, None, None, Priority::Critical));
    cache.start_startup_caching();
    assert!(cache.put("init", b"x", CacheContext::Startup, None, None, Priority::Critical));
    assert_eq!(cache.get("init", CacheContext::Startup, None).unwrap(), Some(b"x".to_vec()));
}

#[test]
fn stop_startup_caching_clears_startup_entries() {
    let cache = UnifiedCache::new(10);
    cache.start_startup_caching();
    cache.put("init", b"x", CacheContext::Startup, None, None, Priority::Critical);
    let removed = cache.stop_startup_caching();
    assert_eq!(removed, 1);
    assert_eq!(cache.get("init", CacheContext::Startup, None).unwrap(), None);
}

#[test]
fn expired_command_entry_is_evicted_on_get() {
    let cache = UnifiedCache::new(10);
    cache.put("r", b"rax=0", CacheContext::Command, None, Some(Duration::from_millis(10)), Priority::Normal);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(cache.get("r", CacheContext::Command, None).unwrap(), None);
}

#[parameterized(
    version = {"version", 1800},
    modules = {"lm", 900},
    effmach = {".effmach", 1800},
    pcr = {"!pcr -- dump", 600},
    vertarget = {"vertarget", 300},
    registers = {"r", 5},
    stack = {"k", 30},
    thread = {"!thread", 60},
    breakpoints = {"bl", 120},
)]
fn command_ttl_overrides_match_the_table(command: &str, expected_secs: u64) {
    assert_eq!(command_ttl_override(command), Some(Duration::from_secs(expected_secs)));
}

#[test]
fn unmatched_command_falls_back_to_context_default() {
    assert_eq!(command_ttl_override("dt _EPROCESS"), None);
}

#[test]
fn capacity_eviction_prefers_lowest_priority_then_oldest() {
    let cache = UnifiedCache::new(2);
    cache.put("a", b"a", CacheContext::Command, None, None, Priority::Low);
    cache.put("b", b"b", CacheContext::Command, None, None, Priority::High);
    // third insert exceeds capacity(2); "a" (Low) must be evicted, not "b" (High).
    cache.put("c", b"c", CacheContext::Command, None, None, Priority::Normal);

    assert_eq!(cache.get("a", CacheContext::Command, None).unwrap(), None);
    assert_eq!(cache.get("b", CacheContext::Command, None).unwrap(), Some(b"b".to_vec()));
    assert_eq!(cache.get("c", CacheContext::Command, None).unwrap(), Some(b"c".to_vec()));
}

#[test]
fn large_payload_is_compressed_and_transparently_decompressed() {
    let cache = UnifiedCache::new(10);
    let big = vec![b'x'; 20_000];
    cache.put("lm", &big, CacheContext::Command, None, None, Priority::Normal);
    let got = cache.get("lm", CacheContext::Command, None).unwrap();
    assert_eq!(got, Some(big));
}

#[test]
fn small_payload_is_not_compressed() {
    let cache = UnifiedCache::new(10);
    cache.put("r", b"rax=0", CacheContext::Command, None, None, Priority::Normal);
    let stats = cache.stats();
    assert_eq!(stats.total_compressed, 0);
}

#[test]
fn invalidate_by_command_removes_only_matching_entries() {
    let cache = UnifiedCache::new(10);
    cache.put("version", b"1", CacheContext::Command, None, None, Priority::Normal);
    cache.put("lm", b"2", CacheContext::Command, None, None, Priority::Normal);
    let removed = cache.invalidate(Some("version"), None, None);
    assert_eq!(removed, 1);
    assert_eq!(cache.get("version", CacheContext::Command, None).unwrap(), None);
    assert_eq!(cache.get("lm", CacheContext::Command, None).unwrap(), Some(b"2".to_vec()));
}

#[test]
fn invalidate_by_pattern_matches_substring_of_command() {
    let cache = UnifiedCache::new(10);
    cache.put("!process 1 7", b"a", CacheContext::Command, None, None, Priority::Normal);
    cache.put("version", b"b", CacheContext::Command, None, None, Priority::Normal);
    let removed = cache.invalidate(None, None, Some("process"));
    assert_eq!(removed, 1);
}

#[test]
fn clear_context_removes_every_entry_in_that_context_only() {
    let cache = UnifiedCache::new(10);
    cache.put("current", b"snap", CacheContext::Session, None, None, Priority::High);
    cache.put("version", b"1", CacheContext::Command, None, None, Priority::Normal);
    let removed = cache.clear_context(CacheContext::Session);
    assert_eq!(removed, 1);
    assert_eq!(cache.get("current", CacheContext::Session, None).unwrap(), None);
    assert_eq!(cache.get("version", CacheContext::Command, None).unwrap(), Some(b"1".to_vec()));
}

#[test]
fn get_moves_entry_to_mru_end_protecting_it_from_eviction() {
    let cache = UnifiedCache::new(2);
    cache.put("a", b"a", CacheContext::Command, None, None, Priority::Normal);
    cache.put("b", b"b", CacheContext::Command, None, None, Priority::Normal);
    // touch "a" so it becomes more-recently-used than "b"
    cache.get("a", CacheContext::Command, None).unwrap();
    cache.put("c", b"c", CacheContext::Command, None, None, Priority::Normal);

    assert_eq!(cache.get("b", CacheContext::Command, None).unwrap(), None);
    assert_eq!(cache.get("a", CacheContext::Command, None).unwrap(), Some(b"a".to_vec()));
}
