//! Tracing integration example
//!
//! Jobs submitted with `submit_traced` run inside the submitter's span, and the
//! worker loop opens `worker` and `job` spans of its own.
//!
//! Run with: `cargo run --example tracing_example --features tracing`
//!
//! Set RUST_LOG to control verbosity:
//! - `RUST_LOG=debug` - show worker and job spans
//! - `RUST_LOG=workerpool=trace` - show this crate's trace events only

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workerpool::prelude::*;

/// Simulates a unit of work and logs inside its span
struct ComputeJob {
    id: u32,
    duration_ms: u64,
}

impl Job for ComputeJob {
    fn run(&mut self) -> std::result::Result<(), JobError> {
        tracing::info!(job_id = self.id, "starting computation");
        thread::sleep(Duration::from_millis(self.duration_ms));
        if self.id % 5 == 4 {
            return Err(JobError::msg(format!("job {} out of memory", self.id)));
        }
        tracing::info!(job_id = self.id, "computation completed");
        Ok(())
    }

    fn name(&self) -> &str {
        "ComputeJob"
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pool = Arc::new(WorkerPool::with_config(
        PoolConfig::new(4).with_thread_name_prefix("traced"),
    )?);

    let drainer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for failure in pool.error_iter() {
                tracing::warn!(%failure, "job failed");
            }
        })
    };

    let batch = tracing::info_span!("batch", size = 10);
    {
        let _entered = batch.enter();
        for id in 0..10 {
            pool.submit_traced(ComputeJob {
                id,
                duration_ms: 20,
            })?;
        }
    }

    pool.shutdown();
    if drainer.join().is_err() {
        tracing::error!("drainer thread panicked");
    }

    let stats = pool.stats();
    tracing::info!(
        completed = stats.jobs_completed,
        failed = stats.jobs_failed,
        "pool shut down"
    );
    Ok(())
}
