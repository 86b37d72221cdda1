//! Stratacache - Tiered Caching and Request Flow Control
//!
//! The in-process caching and concurrency-control layer for an upstream-API
//! aggregation service. Callers consult the cache first; on a miss the
//! upstream fetch is coalesced (one in-flight call per key), optionally
//! micro-batched with neighbouring requests, and always bounded by a
//! concurrency gate before the result is written back with a tier priority.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Caller (fetch path)                      │
//! └───────────────┬─────────────────────────────────────────────────┘
//!                 │ miss
//! ┌───────────────▼───────────┐   ┌──────────────────────────────────┐
//! │  LayeredCache             │   │  Deduplicator (single-flight)    │
//! │  hot → warm → cold        │   │  BatchProcessor (micro-batches)  │
//! │  read promotion upward    │◀──│  ConcurrencyGate (FIFO permits)  │
//! │  write by priority        │   │  RetryPolicy (capped backoff)    │
//! └───────────────────────────┘   └──────────────┬───────────────────┘
//!                                                │ bounded parallelism
//!                                      ┌─────────▼─────────┐
//!                                      │  Upstream platform │
//!                                      └───────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`] - TTL+LRU tier cache, three-tier layered cache, key builders
//! - [`control`] - concurrency gate, deduplicator, retry policy, batcher
//! - [`error`] - Error types
//!
//! All structures are memory-resident and reset on process restart. There is
//! no cross-process sharing and no cancellation: a scheduled task, batch or
//! retry loop runs to completion.

pub mod cache;
pub mod control;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheConfig, CachePriority, CacheStats, LayeredCache, LayeredCacheConfig, LayeredStats,
    TierCache,
};
pub use control::{
    BatchConfig, BatchExecutor, BatchProcessor, BatchStatus, ConcurrencyGate, DedupStatus,
    Deduplicator, GateStatus, RetryPolicy,
};
pub use error::{Error, Result};
