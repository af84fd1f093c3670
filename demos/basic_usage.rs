//! Basic worker pool usage example
//!
//! Two workers, five jobs, one of which fails with "disk full". A drainer thread
//! prints failures while the main thread submits, then shutdown waits for every
//! job.
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use workerpool::prelude::*;

fn main() -> Result<()> {
    println!("=== workerpool - Basic Usage Example ===\n");

    let pool = Arc::new(WorkerPool::new(2)?);
    println!("1. Started pool with {} workers", pool.worker_count());

    let drainer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for failure in pool.error_iter() {
                println!("   error queue: {}", failure);
            }
        })
    };

    println!("\n2. Requesting 5 jobs:");
    for i in 1..=5 {
        pool.execute(move || {
            println!("   job {} running on {:?}", i, thread::current().name());
            thread::sleep(Duration::from_millis(50));
            if i == 3 {
                Err(JobError::msg("disk full"))
            } else {
                Ok(())
            }
        });
    }

    println!("\n3. Shutting down");
    pool.shutdown();
    if drainer.join().is_err() {
        eprintln!("   drainer thread panicked");
    }

    let stats = pool.stats();
    println!("\n4. Statistics:");
    println!("   completed: {}", stats.jobs_completed);
    println!("   failed:    {}", stats.jobs_failed);
    println!("   busy time: {}us", stats.busy_time_us);

    println!("\n=== Example completed successfully ===");
    Ok(())
}
