//! Multi-Tier TTL/LRU Cache
//!
//! In-memory caching with three independently configured tiers and
//! read-promotion toward the hotter tiers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LayeredCache                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Hot tier            │ Warm tier           │ Cold tier            │
//! │  ┌────────────────┐  │ ┌────────────────┐  │ ┌────────────────┐   │
//! │  │ TierCache      │  │ │ TierCache      │  │ │ TierCache      │   │
//! │  │ 200 / 60s      │  │ │ 500 / 300s     │  │ │ 1000 / 1800s   │   │
//! │  └───────▲────────┘  │ └───────▲────────┘  │ └────────────────┘   │
//! │          └── promote ──────────┴── promote ─────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each [`TierCache`] enforces TTL expiry (lazy on read, actively via a
//! background sweeper) and LRU eviction at capacity. Promotion copies a
//! value upward on a lower-tier hit; values never move downward.

mod entry;
mod layered;
mod tier;

pub mod keys;

pub use entry::CacheEntry;
pub use layered::{CachePriority, LayeredCache, LayeredCacheConfig, LayeredStats};
pub use tier::{CacheConfig, CacheStats, TierCache};
