//! Single-Tier TTL+LRU Cache
//!
//! Bounded key/value store with per-entry TTL, hit/miss statistics and
//! least-recently-used eviction at capacity.
//!
//! # Design
//!
//! - Entry table behind a `parking_lot::Mutex`; the lock is never held
//!   across an await point.
//! - LRU order is tracked with a ghost-stamped `VecDeque` beside the entry
//!   map: every touch pushes a fresh `(key, stamp)` pair and eviction pops
//!   from the front, skipping pairs whose stamp no longer matches the live
//!   entry. Eviction is amortized O(1) and always removes the entry with
//!   the oldest last access.
//! - `get_or_set` is single-flight: concurrent misses for the same key
//!   invoke the factory exactly once and share its outcome.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use crate::control::Deduplicator;
use crate::error::Result;

/// Tier cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    pub max_size: usize,
    /// TTL applied when `set` is called without an explicit TTL
    pub default_ttl: Duration,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Convenience constructor for the two knobs callers usually tune
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            max_size,
            default_ttl,
            ..Self::default()
        }
    }
}

/// Hit/miss statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that found nothing (or only a stale entry)
    pub misses: u64,
    /// Resident entry count
    pub size: usize,
    /// hits / (hits + misses), 0.0 when no reads yet
    pub hit_rate: f64,
}

struct State<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// LRU order queue; may contain ghost pairs for touched or removed
    /// entries, bounded by the touch count between cleanup sweeps.
    lru: VecDeque<(String, u64)>,
    next_stamp: u64,
}

impl<T> State<T> {
    fn touch(&mut self, key: &str, now: Instant) {
        self.next_stamp += 1;
        let stamp = self.next_stamp;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.touch(now, stamp);
            self.push_lru(key, stamp);
        }
    }

    /// Append a fresh LRU pair, compacting the queue once ghosts outnumber
    /// live entries so a hot-key read loop cannot grow it without bound
    /// between cleanup sweeps. Compaction drops the queue to one pair per
    /// entry, keeping the cost amortized O(1).
    fn push_lru(&mut self, key: &str, stamp: u64) {
        self.lru.push_back((key.to_string(), stamp));
        if self.lru.len() > 2 * self.entries.len() + 16 {
            let entries = &self.entries;
            self.lru
                .retain(|(k, s)| entries.get(k).map(|e| e.lru_stamp) == Some(*s));
        }
    }

    /// Remove the entry with the oldest last access.
    fn evict_lru(&mut self) {
        while let Some((key, stamp)) = self.lru.pop_front() {
            let live = self.entries.get(&key).map(|e| e.lru_stamp) == Some(stamp);
            if live {
                self.entries.remove(&key);
                return;
            }
        }
    }
}

/// Single-tier TTL+LRU cache
pub struct TierCache<T> {
    state: Mutex<State<T>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Coalesces concurrent `get_or_set` misses for the same key
    dedup: Deduplicator<T>,
}

impl<T: Clone> TierCache<T> {
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                lru: VecDeque::new(),
                next_stamp: 0,
            }),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dedup: Deduplicator::new(),
        }
    }

    /// Insert or overwrite an entry. When inserting a new key at capacity,
    /// the least-recently-accessed entry is evicted first. Never fails.
    pub fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let now = Instant::now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(key) && state.entries.len() >= self.config.max_size {
            state.evict_lru();
        }

        state.next_stamp += 1;
        let stamp = state.next_stamp;
        state
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, now, stamp));
        state.push_lru(key, stamp);
    }

    /// Look up an unexpired entry, bumping its access statistics. A stale
    /// entry is removed on the spot and counted as a miss. Never fails.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            state.entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        state.touch(key, now);
        self.hits.fetch_add(1, Ordering::Relaxed);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Read-through lookup: on a miss, invoke `factory` and store the
    /// outcome under `key`.
    ///
    /// Concurrent calls for the same missing key are coalesced: the factory
    /// runs exactly once and every caller observes the same success or
    /// failure. A failed factory stores nothing, so the next call retries
    /// from scratch.
    pub async fn get_or_set<F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        self.dedup
            .execute(key, || async move {
                let value = factory().await?;
                self.set(key, value.clone(), ttl);
                Ok(value)
            })
            .await
    }

    /// Remove an entry, reporting whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Remove all entries and reset hit/miss statistics
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.lru.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Resident entry count
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True when no entries are resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Sweep out every expired entry and compact the LRU queue. Returns the
    /// number of entries removed. O(n) under the lock; readers and writers
    /// block only for the scan itself.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();

        let State { entries, lru, .. } = &mut *state;
        entries.retain(|_, entry| !entry.is_expired(now));
        lru.retain(|(key, stamp)| entries.get(key).map(|e| e.lru_stamp) == Some(*stamp));

        before - entries.len()
    }

    /// Pre-populate the given keys by fetching them concurrently.
    /// Individual failures are logged and skipped; returns the number of
    /// keys loaded.
    pub async fn warm_up<F, Fut>(&self, keys: &[String], factory: F) -> usize
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        debug!(count = keys.len(), "warming cache");

        let fetches = keys.iter().map(|key| {
            let fut = factory(key.clone());
            async move { (key, fut.await) }
        });

        let mut loaded = 0;
        for (key, outcome) in join_all(fetches).await {
            match outcome {
                Ok(value) => {
                    self.set(key, value, None);
                    loaded += 1;
                }
                Err(error) => warn!(key = %key, %error, "cache warmup fetch failed"),
            }
        }

        debug!(loaded, "cache warmup completed");
        loaded
    }
}

impl<T: Clone + Send + 'static> TierCache<T> {
    /// Spawn the background expiry sweeper, ticking at the configured
    /// cleanup interval. The task runs until the handle is aborted or the
    /// runtime shuts down.
    pub fn spawn_cleanup(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.cleanup_interval);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                let removed = self.cleanup();
                if removed > 0 {
                    debug!(removed, "removed expired cache entries");
                }
            }
        })
    }
}

impl<T: Clone> Default for TierCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicU32;
    use crate::error::Error;

    fn small_cache(max_size: usize) -> TierCache<String> {
        TierCache::with_config(CacheConfig {
            max_size,
            default_ttl: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_set_get_roundtrip() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);

        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_miss() {
        let cache = small_cache(10);
        assert_eq!(cache.get("absent"), None);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_ttl_expiry_on_read() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), Some(Duration::from_millis(20)));

        assert_eq!(cache.get("k"), Some("v".to_string()));

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
        // stale entry was removed on the read
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let cache = small_cache(10);
        cache.set("k", "a".to_string(), None);
        cache.set("k", "b".to_string(), None);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some("b".to_string()));
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let cache = small_cache(3);
        for i in 0..10 {
            cache.set(&format!("k{}", i), format!("v{}", i), None);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_eviction_picks_oldest_last_access() {
        let cache = small_cache(3);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        cache.set("c", "3".to_string(), None);

        // touch "a" so "b" becomes the oldest
        cache.get("a");

        cache.set("d", "4".to_string(), None);

        assert_eq!(cache.len(), 3);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = small_cache(2);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);

        cache.set("a", "1b".to_string(), None);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_hot_key_read_loop_keeps_lru_queue_bounded() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);

        for _ in 0..10_000 {
            cache.get("k");
        }

        let state = cache.state.lock();
        assert!(state.lru.len() <= 2 * state.entries.len() + 16);
    }

    #[test]
    fn test_eviction_order_survives_compaction() {
        let cache = small_cache(3);
        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        cache.set("c", "3".to_string(), None);

        // enough touches to force several compactions
        for _ in 0..100 {
            cache.get("a");
            cache.get("c");
        }

        cache.set("d", "4".to_string(), None);

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_delete() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);

        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear_resets_stats_and_is_idempotent() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);
        cache.get("k");
        cache.get("absent");

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 0);

        // clearing an empty cache is a no-op
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_hit_rate() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);
        cache.get("k");
        cache.get("k");
        cache.get("absent");
        cache.get("absent");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let cache = small_cache(10);
        cache.set("short", "a".to_string(), Some(Duration::from_millis(10)));
        cache.set("long", "b".to_string(), Some(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(20));
        let removed = cache.cleanup();

        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
    }

    #[test]
    fn test_stats_serialize() {
        let cache = small_cache(10);
        cache.set("k", "v".to_string(), None);
        cache.get("k");

        let json = serde_json::to_value(cache.stats()).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["size"], 1);
    }

    #[tokio::test]
    async fn test_get_or_set_populates_on_miss() {
        let cache = small_cache(10);

        let value = cache
            .get_or_set("k", || async { Ok("fetched".to_string()) }, None)
            .await
            .unwrap();

        assert_eq!(value, "fetched");
        assert_eq!(cache.get("k"), Some("fetched".to_string()));
    }

    #[tokio::test]
    async fn test_get_or_set_returns_cached_without_factory() {
        let cache = small_cache(10);
        cache.set("k", "cached".to_string(), None);

        let value = cache
            .get_or_set(
                "k",
                || async { panic!("factory must not run on a hit") },
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, "cached");
    }

    #[tokio::test]
    async fn test_get_or_set_single_flight() {
        let cache = Arc::new(small_cache(10));
        let calls = Arc::new(AtomicU32::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_set(
                "k",
                || {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("shared".to_string())
                    }
                },
                None,
            ),
            cache.get_or_set(
                "k",
                || {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("shared".to_string())
                    }
                },
                None,
            ),
        );

        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_failure_stores_nothing() {
        let cache = small_cache(10);

        let result = cache
            .get_or_set(
                "k",
                || async { Err::<String, _>(Error::Upstream("boom".into())) },
                None,
            )
            .await;

        assert_matches!(result, Err(Error::Upstream(_)));
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_warm_up_skips_failures() {
        let cache = small_cache(10);
        let keys = vec!["good".to_string(), "bad".to_string()];

        let loaded = cache
            .warm_up(&keys, |key| async move {
                if key == "bad" {
                    Err(Error::Upstream("unavailable".into()))
                } else {
                    Ok(format!("value:{}", key))
                }
            })
            .await;

        assert_eq!(loaded, 1);
        assert_eq!(cache.get("good"), Some("value:good".to_string()));
        assert_eq!(cache.get("bad"), None);
    }

    #[tokio::test]
    async fn test_spawn_cleanup_sweeps_expired() {
        let cache = Arc::new(TierCache::with_config(CacheConfig {
            max_size: 10,
            default_ttl: Duration::from_millis(10),
            cleanup_interval: Duration::from_millis(20),
        }));
        cache.set("k", "v".to_string(), None);

        let handle = Arc::clone(&cache).spawn_cleanup();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.len(), 0);
        handle.abort();
    }

    proptest! {
        #[test]
        fn prop_capacity_invariant(keys in prop::collection::vec("[a-z]{1,6}", 1..200)) {
            let cache: TierCache<u32> = TierCache::with_config(CacheConfig {
                max_size: 16,
                default_ttl: Duration::from_secs(60),
                cleanup_interval: Duration::from_secs(60),
            });
            for (i, key) in keys.iter().enumerate() {
                cache.set(key, i as u32, None);
                prop_assert!(cache.len() <= 16);
            }
        }

        #[test]
        fn prop_last_write_wins(values in prop::collection::vec(any::<u32>(), 1..50)) {
            let cache: TierCache<u32> = TierCache::new();
            for value in &values {
                cache.set("k", *value, None);
            }
            prop_assert_eq!(cache.get("k"), values.last().copied());
        }
    }
}
