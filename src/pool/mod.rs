//! Worker pool, worker loops and completion tracking

pub mod config;
pub mod tracker;
pub mod worker;
pub mod worker_pool;

pub use config::{ErrorPolicy, PoolConfig};
pub use tracker::{CompletionGuard, CompletionTracker};
pub use worker::{WorkerStats, WorkerStatsSnapshot};
pub use worker_pool::{PoolStats, WorkerPool};
