//! Request Flow Control
//!
//! The primitives that sit between a cache miss and the upstream platform:
//!
//! - [`ConcurrencyGate`] - bounded-parallelism task executor with FIFO
//!   admission, so outbound load never exceeds a fixed limit
//! - [`Deduplicator`] - single-flight coalescing of concurrent identical
//!   requests; all co-waiters share one outcome
//! - [`RetryPolicy`] - capped exponential-backoff retry for any fallible
//!   async operation
//! - [`BatchProcessor`] - groups individual requests into size- or
//!   time-triggered batches, retried whole-batch on failure
//!
//! None of these support cancellation: once scheduled, a task, batch or
//! retry loop runs to completion.

mod batch;
mod dedup;
mod gate;
mod retry;

pub use batch::{BatchConfig, BatchExecutor, BatchProcessor, BatchStatus};
pub use dedup::{DedupStatus, Deduplicator};
pub use gate::{ConcurrencyGate, GateStatus};
pub use retry::RetryPolicy;
