//! Pool configuration

use crate::core::{PoolError, Result};

/// How failures travel from workers to callers of [`WorkerPool::errors`].
///
/// [`WorkerPool::errors`]: crate::pool::WorkerPool::errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Zero-capacity handoff (default).
    ///
    /// A worker whose job fails blocks until some caller receives the failure
    /// through `errors()`. If nobody ever does, that worker stays parked and the
    /// pool silently loses capacity; with every worker parked, `request` and
    /// `shutdown` block forever. Use it only when a thread drains errors
    /// concurrently with submission, for example by looping over
    /// [`WorkerPool::error_iter`], which ends cleanly once the pool shuts down.
    ///
    /// [`WorkerPool::error_iter`]: crate::pool::WorkerPool::error_iter
    #[default]
    Handoff,

    /// Buffer one failure per worker.
    ///
    /// Workers keep running as long as the caller drains errors at least as
    /// often as the whole pool can fail.
    PerWorker,

    /// Buffer up to `n` failures, then apply back-pressure to the failing worker.
    /// `Bounded(0)` behaves like [`ErrorPolicy::Handoff`].
    Bounded(usize),

    /// Never block a worker. Unread failures accumulate in memory.
    Unbounded,

    /// Log failures at `warn` level and drop them. Nothing reaches `errors()`.
    LogAndDiscard,
}

impl ErrorPolicy {
    /// Channel capacity for a pool of `workers`, `None` meaning unbounded.
    pub fn capacity(&self, workers: usize) -> Option<usize> {
        match self {
            ErrorPolicy::Handoff | ErrorPolicy::LogAndDiscard => Some(0),
            ErrorPolicy::PerWorker => Some(workers),
            ErrorPolicy::Bounded(n) => Some(*n),
            ErrorPolicy::Unbounded => None,
        }
    }

    /// Whether failures are forwarded to the error queue at all
    pub fn forwards(&self) -> bool {
        !matches!(self, ErrorPolicy::LogAndDiscard)
    }
}

/// Configuration for a [`WorkerPool`](crate::pool::WorkerPool)
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the life of the pool
    pub workers: usize,
    /// Thread name prefix; worker `i` is named `{prefix}-{i}`
    pub thread_name_prefix: String,
    /// Buffering of the error queue
    pub error_policy: ErrorPolicy,
}

impl PoolConfig {
    /// Create a new configuration with the given number of workers
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            thread_name_prefix: "worker".to_string(),
            error_policy: ErrorPolicy::default(),
        }
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the error queue policy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PoolError::invalid_config(
                "workers",
                "Number of workers must be greater than 0",
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread names cannot contain NUL bytes",
            ));
        }
        Ok(())
    }
}
