//! Error queue policies example
//!
//! Runs the same failing workload under each `ErrorPolicy` and shows how many
//! failures reach the caller.
//!
//! Run with: cargo run --example error_policies

use std::sync::Arc;
use std::thread;
use std::time::Instant;
use workerpool::prelude::*;

const JOBS: usize = 20;

fn submit_workload(pool: &WorkerPool) {
    for i in 0..JOBS {
        pool.execute(move || {
            if i % 4 == 0 {
                Err(JobError::msg(format!("record {} rejected", i)))
            } else {
                Ok(())
            }
        });
    }
}

/// Handoff needs a concurrent reader, or the first failure parks a worker
fn run_handoff() -> Result<usize> {
    let pool = Arc::new(WorkerPool::new(4)?);
    let drainer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.error_iter().count())
    };

    submit_workload(&pool);
    pool.shutdown();
    Ok(drainer.join().unwrap_or(0))
}

/// Buffered policies can be read after shutdown, as long as the buffer never
/// fills while jobs are still being submitted
fn run_buffered(policy: ErrorPolicy) -> Result<usize> {
    let pool = WorkerPool::with_config(PoolConfig::new(4).with_error_policy(policy))?;
    let mut received = 0;
    for i in 0..JOBS {
        pool.execute(move || {
            if i % 4 == 0 {
                Err(JobError::msg(format!("record {} rejected", i)))
            } else {
                Ok(())
            }
        });
        received += pool.drain_errors().len();
    }
    pool.shutdown();
    Ok(received + pool.drain_errors().len())
}

fn main() -> Result<()> {
    println!("=== workerpool - Error Policies Example ===\n");

    let start = Instant::now();
    println!("Handoff:       {} failures received", run_handoff()?);

    for (label, policy) in [
        ("PerWorker", ErrorPolicy::PerWorker),
        ("Bounded(2)", ErrorPolicy::Bounded(2)),
        ("Unbounded", ErrorPolicy::Unbounded),
        ("LogAndDiscard", ErrorPolicy::LogAndDiscard),
    ] {
        println!("{:<14} {} failures received", format!("{}:", label), run_buffered(policy)?);
    }

    println!("\nAll policies ran in {:?}", start.elapsed());
    Ok(())
}
