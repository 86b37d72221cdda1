//! Batch Processor - Size/Time-Triggered Micro-Batching
//!
//! Groups individual requests into batches to amortize per-call overhead
//! against the upstream platform.
//!
//! # Workflow
//!
//! ```text
//! add(input) ──▶ FIFO queue ──▶ driver loop ──▶ executor(batch) ──▶ resolve
//!                   │               │                 │ per-item, positional
//!                   │               │ at capacity:    │
//!                   │               │ poll until a    └─ on failure: retry the
//!                   │               │ batch settles       whole batch, backoff
//!                   │               │                      retry_delay * attempt
//!                   └─ dispatch now when a full batch is queued or a batch
//!                      slot is idle, otherwise after max_wait_time
//! ```
//!
//! The executor's output vector must align positionally with its input
//! vector: output `i` resolves the item that contributed input `i`. A batch
//! that still fails after `retry_attempts` rejects every one of its items
//! with the same error; failures never leak into the scheduling loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{error, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Poll interval while every batch slot is busy
const REDISPATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Batch processor configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum items per batch
    pub batch_size: usize,
    /// How long a partially filled batch may wait before dispatch
    pub max_wait_time: Duration,
    /// Maximum batches executing at once
    pub max_concurrency: usize,
    /// Whole-batch attempts, including the first (values below 1 behave as 1)
    pub retry_attempts: u32,
    /// Base backoff between attempts, scaled linearly by attempt number
    pub retry_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_wait_time: Duration::from_millis(100),
            max_concurrency: 3,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Snapshot of the processor's queue and dispatch state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatus {
    /// Items waiting to be grouped into a batch
    pub queue_length: usize,
    /// Batches currently executing
    pub active_batches: usize,
    /// Whether a driver loop is scheduled or running
    pub processing: bool,
}

/// Executes one batch of inputs against the upstream platform.
///
/// The returned vector must align positionally with `inputs`.
#[async_trait]
pub trait BatchExecutor<In, Out>: Send + Sync {
    async fn execute(&self, inputs: Vec<In>) -> Result<Vec<Out>>;
}

struct PendingItem<In, Out> {
    id: Uuid,
    input: In,
    tx: oneshot::Sender<Result<Out>>,
    enqueued_at: Instant,
}

struct Inner<In, Out> {
    executor: Arc<dyn BatchExecutor<In, Out>>,
    queue: Mutex<VecDeque<PendingItem<In, Out>>>,
    processing: AtomicBool,
    active_batches: AtomicUsize,
    config: BatchConfig,
}

/// Groups individual requests into size- or time-triggered batches
pub struct BatchProcessor<In, Out> {
    inner: Arc<Inner<In, Out>>,
}

impl<In, Out> Clone for BatchProcessor<In, Out> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<In, Out> BatchProcessor<In, Out>
where
    In: Clone + Send + 'static,
    Out: Send + 'static,
{
    /// Create a processor dispatching batches to `executor`. A
    /// `max_concurrency` of zero would leave the driver loop unable to ever
    /// dispatch, so it is clamped to one.
    pub fn new(executor: Arc<dyn BatchExecutor<In, Out>>, mut config: BatchConfig) -> Self {
        config.max_concurrency = config.max_concurrency.max(1);
        Self {
            inner: Arc::new(Inner {
                executor,
                queue: Mutex::new(VecDeque::new()),
                processing: AtomicBool::new(false),
                active_batches: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// Enqueue one input and wait for its result. The item is resolved or
    /// rejected exactly once: with its positional output, with the batch's
    /// terminal error, or with [`Error::QueueCleared`].
    pub async fn add(&self, input: In) -> Result<Out> {
        let (tx, rx) = oneshot::channel();
        {
            self.inner.queue.lock().push_back(PendingItem {
                id: Uuid::new_v4(),
                input,
                tx,
                enqueued_at: Instant::now(),
            });
        }
        Inner::schedule(Arc::clone(&self.inner));

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::InFlightDropped),
        }
    }

    /// Reject every queued item with [`Error::QueueCleared`]. Items already
    /// dispatched in a batch are unaffected. Returns the number rejected;
    /// clearing an empty queue is a no-op.
    pub fn clear(&self) -> usize {
        let drained: Vec<PendingItem<In, Out>> = self.inner.queue.lock().drain(..).collect();
        let rejected = drained.len();
        for item in drained {
            let _ = item.tx.send(Err(Error::QueueCleared));
        }
        rejected
    }

    /// Queue and dispatch snapshot
    pub fn status(&self) -> BatchStatus {
        BatchStatus {
            queue_length: self.inner.queue.lock().len(),
            active_batches: self.inner.active_batches.load(Ordering::SeqCst),
            processing: self.inner.processing.load(Ordering::SeqCst),
        }
    }
}

impl<In, Out> Inner<In, Out>
where
    In: Clone + Send + 'static,
    Out: Send + 'static,
{
    /// Start one driver loop unless one is already scheduled. Dispatch is
    /// immediate when a full batch is queued or a batch slot is idle, and
    /// deferred by `max_wait_time` otherwise so small bursts can coalesce.
    fn schedule(inner: Arc<Self>) {
        if inner
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let immediate = inner.queue.lock().len() >= inner.config.batch_size
            || inner.active_batches.load(Ordering::SeqCst) < inner.config.max_concurrency;

        tokio::spawn(async move {
            if !immediate {
                sleep(inner.config.max_wait_time).await;
            }
            inner.drive().await;
        });
    }

    /// Drain the queue into batches until it is empty, spawning each batch
    /// as its own task and never exceeding `max_concurrency` active batches.
    async fn drive(self: Arc<Self>) {
        loop {
            if self.active_batches.load(Ordering::SeqCst) >= self.config.max_concurrency {
                sleep(REDISPATCH_INTERVAL).await;
                continue;
            }

            let batch: Vec<PendingItem<In, Out>> = {
                let mut queue = self.queue.lock();
                let take = self.config.batch_size.min(queue.len());
                queue.drain(..take).collect()
            };

            if batch.is_empty() {
                self.processing.store(false, Ordering::SeqCst);
                // an add() may have raced in between the drain and the
                // flag clear; reclaim the loop if so
                let raced = !self.queue.lock().is_empty()
                    && self
                        .processing
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok();
                if raced {
                    continue;
                }
                return;
            }

            if let Some(oldest) = batch.first() {
                trace!(
                    size = batch.len(),
                    waited_ms = oldest.enqueued_at.elapsed().as_millis() as u64,
                    "dispatching batch"
                );
            }

            self.active_batches.fetch_add(1, Ordering::SeqCst);
            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                worker.execute_batch(batch).await;
                worker.active_batches.fetch_sub(1, Ordering::SeqCst);
                if !worker.queue.lock().is_empty() {
                    Self::schedule(Arc::clone(&worker));
                }
            });
        }
    }

    /// Run one batch to settlement: every item is resolved with its
    /// positional output or rejected with the batch's terminal error.
    async fn execute_batch(&self, batch: Vec<PendingItem<In, Out>>) {
        let inputs: Vec<In> = batch.iter().map(|item| item.input.clone()).collect();
        let max_attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.executor.execute(inputs.clone()).await {
                Ok(outputs) => {
                    let mut outputs = outputs.into_iter();
                    for (index, item) in batch.into_iter().enumerate() {
                        match outputs.next() {
                            Some(output) => {
                                let _ = item.tx.send(Ok(output));
                            }
                            None => {
                                warn!(index, item = %item.id, "batch returned no output for item");
                                let _ = item.tx.send(Err(Error::BatchResultMissing(index)));
                            }
                        }
                    }
                    return;
                }
                Err(err) if attempt < max_attempts => {
                    warn!(attempt, %err, "batch attempt failed, retrying");
                    sleep(self.config.retry_delay * attempt).await;
                }
                Err(err) => {
                    error!(attempts = max_attempts, %err, "batch failed, rejecting all items");
                    for item in batch {
                        let _ = item.tx.send(Err(err.clone()));
                    }
                    return;
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
