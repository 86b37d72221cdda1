//! Error types for the caching and flow-control layer
//!
//! `Error` is `Clone`: a single upstream failure is fanned out verbatim to
//! every co-waiter of a deduplicated call and to every item of a failed
//! batch. A cache miss is never an error; it is `Option::None`.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the caching and flow-control layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Upstream task or factory failure surfaced through this layer
    #[error("upstream call failed: {0}")]
    Upstream(String),

    /// Batch function returned fewer outputs than inputs
    #[error("no batch result for item at index {0}")]
    BatchResultMissing(usize),

    /// Pending batch item rejected because the queue was cleared
    #[error("queue cleared")]
    QueueCleared,

    /// In-flight deduplicated call dropped before it settled
    #[error("in-flight request dropped before completing")]
    InFlightDropped,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an arbitrary upstream error for propagation through this layer
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Error::Upstream(err.to_string())
    }
}
