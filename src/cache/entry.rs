//! Cache Entry Types

use std::time::{Duration, Instant};

/// A single cached value with its expiry and access bookkeeping.
///
/// Owned exclusively by the [`TierCache`](super::TierCache) that created it;
/// removed on explicit delete, on TTL expiry (checked lazily on read and
/// actively by the cleanup sweep) or on LRU eviction at capacity.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub(crate) value: T,
    /// Creation time; the entry is stale once `now - created_at > ttl`
    pub(crate) created_at: Instant,
    /// Time-to-live for this entry
    pub(crate) ttl: Duration,
    /// Number of reads served from this entry
    pub(crate) access_count: u64,
    /// Last read time, drives LRU eviction order
    pub(crate) last_accessed: Instant,
    /// Stamp of the entry's newest position in the LRU queue. Queue pairs
    /// carrying an older stamp are ghosts and are skipped during eviction.
    pub(crate) lru_stamp: u64,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(value: T, ttl: Duration, now: Instant, stamp: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed: now,
            lru_stamp: stamp,
        }
    }

    /// Check whether the entry's TTL has elapsed
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.ttl
    }

    /// Record a read: bump the access count and refresh the LRU position
    pub(crate) fn touch(&mut self, now: Instant, stamp: u64) {
        self.access_count += 1;
        self.last_accessed = now;
        self.lru_stamp = stamp;
    }

    /// Number of reads served from this entry
    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Time of the most recent read (or creation, if never read)
    #[inline]
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }
}

// =============================================================================
// Tests
// =============================================================================
