//! Layered Cache - Hot/Warm/Cold Tiers with Read Promotion
//!
//! Composes three independent [`TierCache`]s with increasing TTL and
//! capacity. A lookup probes hot, then warm, then cold; a hit in a lower
//! tier copies the value one tier upward so frequently re-read values
//! migrate toward the short-TTL hot tier. Writes go directly to the tier
//! selected by the caller's priority; there is no demotion.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use super::tier::{CacheConfig, CacheStats, TierCache};

/// Tier a write is directed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePriority {
    /// Hot tier - short TTL, small capacity, probed first
    Hot,
    /// Warm tier - medium TTL and capacity
    Warm,
    /// Cold tier - long TTL, large capacity, probed last
    Cold,
}

impl std::fmt::Display for CachePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePriority::Hot => write!(f, "hot"),
            CachePriority::Warm => write!(f, "warm"),
            CachePriority::Cold => write!(f, "cold"),
        }
    }
}

/// Per-tier configuration of the layered cache
#[derive(Debug, Clone)]
pub struct LayeredCacheConfig {
    /// Hot tier configuration
    pub hot: CacheConfig,
    /// Warm tier configuration
    pub warm: CacheConfig,
    /// Cold tier configuration
    pub cold: CacheConfig,
}

impl Default for LayeredCacheConfig {
    fn default() -> Self {
        Self {
            hot: CacheConfig::new(200, Duration::from_secs(60)),
            warm: CacheConfig::new(500, Duration::from_secs(300)),
            cold: CacheConfig::new(1000, Duration::from_secs(1800)),
        }
    }
}

/// Combined statistics snapshot across all three tiers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayeredStats {
    /// Hot tier statistics
    pub hot: CacheStats,
    /// Warm tier statistics
    pub warm: CacheStats,
    /// Cold tier statistics
    pub cold: CacheStats,
}

/// Three-tier cache with read promotion
pub struct LayeredCache<T> {
    hot: Arc<TierCache<T>>,
    warm: Arc<TierCache<T>>,
    cold: Arc<TierCache<T>>,
}

impl<T: Clone> LayeredCache<T> {
    /// Create a layered cache with default tier profiles
    pub fn new() -> Self {
        Self::with_config(LayeredCacheConfig::default())
    }

    /// Create a layered cache with custom tier profiles
    pub fn with_config(config: LayeredCacheConfig) -> Self {
        Self {
            hot: Arc::new(TierCache::with_config(config.hot)),
            warm: Arc::new(TierCache::with_config(config.warm)),
            cold: Arc::new(TierCache::with_config(config.cold)),
        }
    }

    /// Probe hot, then warm, then cold. A warm hit is promoted into hot and
    /// a cold hit into warm; values never move downward.
    pub fn get(&self, key: &str) -> Option<T> {
        if let Some(value) = self.hot.get(key) {
            return Some(value);
        }

        if let Some(value) = self.warm.get(key) {
            self.hot.set(key, value.clone(), None);
            return Some(value);
        }

        if let Some(value) = self.cold.get(key) {
            self.warm.set(key, value.clone(), None);
            return Some(value);
        }

        None
    }

    /// Write directly to the tier the priority names
    pub fn set(&self, key: &str, value: T, priority: CachePriority) {
        match priority {
            CachePriority::Hot => self.hot.set(key, value, None),
            CachePriority::Warm => self.warm.set(key, value, None),
            CachePriority::Cold => self.cold.set(key, value, None),
        }
    }

    /// Remove a key from every tier, reporting whether any copy existed
    pub fn delete(&self, key: &str) -> bool {
        let hot = self.hot.delete(key);
        let warm = self.warm.delete(key);
        let cold = self.cold.delete(key);
        hot || warm || cold
    }

    /// Clear all tiers
    pub fn clear(&self) {
        self.hot.clear();
        self.warm.clear();
        self.cold.clear();
    }

    /// Combined statistics snapshot
    pub fn stats(&self) -> LayeredStats {
        LayeredStats {
            hot: self.hot.stats(),
            warm: self.warm.stats(),
            cold: self.cold.stats(),
        }
    }

    /// Hot tier
    pub fn hot(&self) -> &TierCache<T> {
        &self.hot
    }

    /// Warm tier
    pub fn warm(&self) -> &TierCache<T> {
        &self.warm
    }

    /// Cold tier
    pub fn cold(&self) -> &TierCache<T> {
        &self.cold
    }
}

impl<T: Clone + Send + 'static> LayeredCache<T> {
    /// Spawn the expiry sweeper for every tier
    pub fn spawn_cleanup(&self) -> Vec<JoinHandle<()>> {
        vec![
            Arc::clone(&self.hot).spawn_cleanup(),
            Arc::clone(&self.warm).spawn_cleanup(),
            Arc::clone(&self.cold).spawn_cleanup(),
        ]
    }
}

impl<T: Clone> Default for LayeredCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
