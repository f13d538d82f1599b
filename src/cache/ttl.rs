//! Time-to-live cache with hit/miss accounting
//!
//! Provides a `TtlCache` that keeps values in memory for a fixed TTL. Entries
//! are checked on every access and dropped the moment they are seen expired,
//! so an expired entry is indistinguishable from a missing one.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// Default time-to-live for cache entries (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Entry count above which `set` sweeps expired entries
pub const DEFAULT_SWEEP_THRESHOLD: usize = 100;

/// A stored value together with the instant it was written
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// The cached value
    value: V,
    /// When the value was stored
    stored_at: Instant,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of `get` calls that returned a value
    pub hits: u64,
    /// Number of `get` calls that found nothing or an expired entry
    pub misses: u64,
    /// Entries currently stored (expired ones may linger until touched or swept)
    pub size: usize,
    /// `hits / (hits + misses) * 100`, rounded to 2 decimals; 0 before any access
    pub hit_rate: f64,
}

/// Mutable state guarded by the cache lock
#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Bounded in-memory cache with per-entry expiry
///
/// All operations take a single lock, so lazy expiry, writes and the
/// threshold sweep never interleave on the same instance. Share it across
/// tasks with an `Arc`.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Duration,
    sweep_threshold: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates a cache with the given TTL and the default sweep threshold
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            ttl,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a cache from a TTL in whole seconds
    ///
    /// Negative values are treated as zero, which expires every entry on its
    /// next access.
    pub fn from_seconds(ttl_seconds: i64) -> Self {
        Self::new(Duration::from_secs(ttl_seconds.max(0) as u64))
    }

    /// Sets the entry count above which `set` sweeps expired entries
    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    /// Replaces the time source (useful for testing)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        // A zero TTL disables retention outright
        self.ttl.is_zero() || now.saturating_duration_since(entry.stored_at) > self.ttl
    }

    /// Looks up a value, counting a hit or a miss
    ///
    /// An entry found expired is removed and counted as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            inner.entries.remove(key);
            inner.misses += 1;
            return None;
        }

        inner.hits += 1;
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores a value stamped with the current time, replacing any previous one
    ///
    /// When the entry count exceeds the sweep threshold afterwards, every
    /// expired entry is removed.
    pub fn set(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );

        if inner.entries.len() > self.sweep_threshold {
            let before = inner.entries.len();
            inner.entries.retain(|_, entry| !self.is_expired(entry, now));
            debug!(
                removed = before - inner.entries.len(),
                remaining = inner.entries.len(),
                "swept expired cache entries"
            );
        }
    }

    /// Reports whether a fresh entry exists without touching the counters
    ///
    /// Like `get`, an expired entry is removed as a side effect.
    pub fn has(&self, key: &K) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            None => return false,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            inner.entries.remove(key);
            return false;
        }

        true
    }

    /// Drops every entry; hit and miss counters are kept
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet removed
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Returns the current counters and hit rate
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let accesses = inner.hits + inner.misses;
        let hit_rate = if accesses == 0 {
            0.0
        } else {
            let percent = inner.hits as f64 / accesses as f64 * 100.0;
            (percent * 100.0).round() / 100.0
        };

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            hit_rate,
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn create_test_cache(ttl_secs: u64) -> (TtlCache<String, String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::new(Duration::from_secs(ttl_secs)).with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_default_cache_uses_default_ttl() {
        let cache: TtlCache<String, String> = TtlCache::default();

        assert_eq!(cache.ttl(), DEFAULT_TTL);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (cache, _clock) = create_test_cache(60);

        assert!(cache.get(&"missing".to_string()).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_set_then_get_within_ttl_is_a_hit() {
        let (cache, _clock) = create_test_cache(1);

        cache.set("a".to_string(), "x".to_string());

        assert_eq!(cache.get(&"a".to_string()), Some("x".to_string()));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_entry_expires_strictly_after_ttl() {
        let (cache, clock) = create_test_cache(1);
        cache.set("a".to_string(), "x".to_string());

        // Exactly at the TTL boundary the entry is still valid
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a".to_string()), Some("x".to_string()));

        clock.advance(Duration::from_millis(1));
        assert!(cache.get(&"a".to_string()).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0, "expired entry should be removed on access");
    }

    #[test]
    fn test_zero_ttl_expires_on_next_access() {
        let (cache, _clock) = create_test_cache(0);

        cache.set("a".to_string(), "x".to_string());

        assert!(cache.get(&"a".to_string()).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_negative_ttl_behaves_like_zero() {
        let cache: TtlCache<String, String> = TtlCache::from_seconds(-30);
        assert_eq!(cache.ttl(), Duration::ZERO);

        cache.set("a".to_string(), "x".to_string());
        assert!(cache.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_set_overwrites_and_restamps_existing_key() {
        let (cache, clock) = create_test_cache(10);
        cache.set("k".to_string(), "first".to_string());

        clock.advance(Duration::from_secs(8));
        cache.set("k".to_string(), "second".to_string());

        // 16s after the first write but only 8s after the second
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&"k".to_string()), Some("second".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_has_does_not_touch_counters() {
        // Unlike `get`, `has` leaves hit/miss accounting alone. This mirrors the
        // long-standing behaviour callers rely on, even though it looks asymmetric.
        let (cache, _clock) = create_test_cache(60);
        cache.set("a".to_string(), "x".to_string());

        assert!(cache.has(&"a".to_string()));
        assert!(!cache.has(&"b".to_string()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_has_removes_expired_entry() {
        let (cache, clock) = create_test_cache(5);
        cache.set("a".to_string(), "x".to_string());

        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.len(), 1);
        assert!(!cache.has(&"a".to_string()));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let (cache, _clock) = create_test_cache(60);
        cache.set("a".to_string(), "x".to_string());
        cache.get(&"a".to_string());
        cache.get(&"b".to_string());

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!(cache.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_hit_rate_is_zero_without_accesses() {
        let (cache, _clock) = create_test_cache(60);
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_rounds_to_two_decimals() {
        let (cache, _clock) = create_test_cache(60);
        cache.set("a".to_string(), "x".to_string());

        cache.get(&"a".to_string());
        cache.get(&"b".to_string());
        cache.get(&"c".to_string());

        // 1 / 3 * 100 = 33.333...
        assert_eq!(cache.stats().hit_rate, 33.33);
    }

    #[test]
    fn test_hits_plus_misses_equals_get_calls() {
        let (cache, clock) = create_test_cache(3);
        let mut gets = 0;

        for i in 0..10 {
            cache.set(format!("key_{}", i % 4), i.to_string());
            cache.has(&format!("key_{}", i % 3));
            cache.get(&format!("key_{}", i % 5));
            gets += 1;
            clock.advance(Duration::from_secs(1));
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, gets);
    }

    #[test]
    fn test_sweep_removes_expired_entries_past_threshold() {
        let (cache, _clock) = create_test_cache(0);
        let cache = cache.with_sweep_threshold(100);

        for i in 0..100 {
            cache.set(format!("key_{}", i), "v".to_string());
        }
        assert_eq!(cache.len(), 100, "no sweep at or below the threshold");

        cache.set("key_100".to_string(), "v".to_string());
        assert_eq!(cache.len(), 0, "zero TTL leaves nothing after the sweep");
    }

    #[test]
    fn test_sweep_keeps_fresh_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(10))
            .with_sweep_threshold(3)
            .with_clock(clock.clone());

        cache.set("old_1".to_string(), 1);
        cache.set("old_2".to_string(), 2);
        clock.advance(Duration::from_secs(11));
        cache.set("new_1".to_string(), 3);
        assert_eq!(cache.len(), 3);

        cache.set("new_2".to_string(), 4);

        assert_eq!(cache.len(), 2);
        assert!(cache.has(&"new_1".to_string()));
        assert!(cache.has(&"new_2".to_string()));
    }

    #[test]
    fn test_concurrent_access_keeps_counts_consistent() {
        let cache: Arc<TtlCache<u32, u32>> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        cache.set(i % 50, t);
                        cache.get(&(i % 60));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 1000);
        assert_eq!(stats.size, 50);
    }
}
