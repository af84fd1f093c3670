//! Convenient re-exports for common types and traits

pub use crate::core::{BoxError, BoxedJob, ClosureJob, Job, JobError, PoolError, Result};
pub use crate::pool::{ErrorPolicy, PoolConfig, PoolStats, WorkerPool};
