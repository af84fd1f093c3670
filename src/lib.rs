//! # workerpool
//!
//! A fixed-size worker pool: N worker threads pull jobs from a shared rendezvous
//! queue, run them, and report failures through a separate error queue. Shutdown
//! closes the job queue and waits for every worker to exit.
//!
//! ## Features
//!
//! - **Rendezvous handoff**: `request` blocks until an idle worker takes the job
//! - **Error queue**: failures are delivered in push order through `errors()`,
//!   `next_error()` or `error_iter()`, with an explicit [`ErrorPolicy`] for
//!   buffering
//! - **Orderly shutdown**: every accepted job finishes before `shutdown` returns
//! - **Panic isolation**: a panicking job is reported as a failure and its worker
//!   keeps running
//! - **Worker statistics**: per-worker counters with a serializable snapshot
//!
//! ## Quick Start
//!
//! ```rust
//! use workerpool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(4)?;
//!
//! for i in 0..10 {
//!     pool.execute(move || {
//!         println!("Job {} running", i);
//!         Ok(())
//!     });
//! }
//!
//! pool.shutdown();
//! assert_eq!(pool.stats().jobs_completed, 10);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Jobs
//!
//! ```rust
//! use workerpool::prelude::*;
//!
//! struct Flush {
//!     path: String,
//! }
//!
//! impl Job for Flush {
//!     fn run(&mut self) -> std::result::Result<(), JobError> {
//!         Err(JobError::msg(format!("{}: disk full", self.path)))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Flush"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(2)?;
//! pool.request(Flush { path: "/var/log".to_string() });
//!
//! let failure = pool.errors();
//! assert_eq!(failure.to_string(), "/var/log: disk full");
//! pool.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Draining Errors
//!
//! The default [`ErrorPolicy::Handoff`] error queue has no capacity: a worker whose
//! job failed waits until someone takes the failure. Run a drainer thread over
//! [`WorkerPool::error_iter`]; it ends once shutdown has stopped every worker.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use workerpool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = Arc::new(WorkerPool::new(2)?);
//! let drainer = {
//!     let pool = Arc::clone(&pool);
//!     thread::spawn(move || {
//!         for failure in pool.error_iter() {
//!             eprintln!("job failed: {}", failure);
//!         }
//!     })
//! };
//!
//! for i in 0..5 {
//!     pool.execute(move || {
//!         if i == 3 {
//!             Err(JobError::msg("disk full"))
//!         } else {
//!             Ok(())
//!         }
//!     });
//! }
//!
//! pool.shutdown();
//! drainer.join().expect("drainer panicked");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Queue Policies
//!
//! When nobody drains errors concurrently, pick a buffered policy:
//!
//! ```rust
//! use workerpool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = PoolConfig::new(4)
//!     .with_thread_name_prefix("ingest")
//!     .with_error_policy(ErrorPolicy::Unbounded);
//! let pool = WorkerPool::with_config(config)?;
//!
//! pool.execute(|| Err(JobError::msg("bad record")));
//! pool.shutdown();
//!
//! assert_eq!(pool.drain_errors().len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use crate::core::{BoxError, BoxedJob, ClosureJob, Job, JobError, PoolError, Result};
pub use crate::pool::{ErrorPolicy, PoolConfig, PoolStats, WorkerPool};
#[cfg(feature = "tracing")]
pub use crate::tracing::TracedJob;
