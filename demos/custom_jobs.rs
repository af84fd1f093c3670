//! Custom job types example
//!
//! Implements `Job` for a struct, uses named closure jobs, and recovers the
//! original error type from a failure.
//!
//! Run with: cargo run --example custom_jobs

use std::io;
use std::thread;
use std::time::Duration;
use workerpool::prelude::*;

/// Sums a batch of readings
struct ChecksumJob {
    id: usize,
    data: Vec<u32>,
}

impl Job for ChecksumJob {
    fn run(&mut self) -> std::result::Result<(), JobError> {
        let sum: u64 = self.data.iter().map(|&v| u64::from(v)).sum();
        println!(
            "ChecksumJob {}: {} items, sum = {} on {:?}",
            self.id,
            self.data.len(),
            sum,
            thread::current().name()
        );
        thread::sleep(Duration::from_millis(50));
        Ok(())
    }

    fn name(&self) -> &str {
        "ChecksumJob"
    }
}

/// Writes a file, failing with an `io::Error` when the volume is read-only
struct WriteJob {
    path: &'static str,
    read_only: bool,
}

impl Job for WriteJob {
    fn run(&mut self) -> std::result::Result<(), JobError> {
        if self.read_only {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, self.path).into());
        }
        println!("WriteJob: wrote {}", self.path);
        Ok(())
    }

    fn name(&self) -> &str {
        "WriteJob"
    }
}

fn main() -> Result<()> {
    println!("=== workerpool - Custom Jobs Example ===\n");

    let config = PoolConfig::new(3)
        .with_thread_name_prefix("custom")
        .with_error_policy(ErrorPolicy::Unbounded);
    let pool = WorkerPool::with_config(config)?;

    for id in 0..3 {
        pool.request(ChecksumJob {
            id,
            data: (0..100 * (id as u32 + 1)).collect(),
        });
    }

    pool.request(WriteJob {
        path: "/tmp/report.csv",
        read_only: false,
    });
    pool.request(WriteJob {
        path: "/mnt/archive/report.csv",
        read_only: true,
    });

    pool.request(ClosureJob::with_name(
        || {
            println!("Named closure job running");
            Ok(())
        },
        "Cleanup",
    ));

    pool.shutdown();

    for failure in pool.drain_errors() {
        match failure.downcast_ref::<io::Error>() {
            Some(e) => println!("I/O failure ({:?}): {}", e.kind(), e),
            None => println!("Failure: {}", failure),
        }
    }

    println!("\nJobs run: {}", pool.stats().jobs_run());
    Ok(())
}
