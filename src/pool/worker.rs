//! Worker thread implementation

use crate::core::{BoxedJob, Job, JobError, PoolError, Result};
use crate::pool::config::ErrorPolicy;
use crate::pool::tracker::CompletionGuard;
use crossbeam::channel::{Receiver, SendError, Sender};
use crossbeam::sync::WaitGroup;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Jobs that returned `Ok(())`
    pub jobs_completed: AtomicU64,
    /// Jobs that returned an error
    pub jobs_failed: AtomicU64,
    /// Jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Total time spent inside `Job::run` (microseconds)
    pub busy_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, outcome: &Outcome, elapsed_us: u64) {
        let counter = match outcome {
            Outcome::Completed => &self.jobs_completed,
            Outcome::Failed(_) => &self.jobs_failed,
            Outcome::Panicked(_) => &self.jobs_panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.busy_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    /// Total jobs this worker has run, whatever their outcome
    pub fn jobs_run(&self) -> u64 {
        self.jobs_completed.load(Ordering::Relaxed)
            + self.jobs_failed.load(Ordering::Relaxed)
            + self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self, worker_id: usize) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            worker_id,
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_panicked: self.jobs_panicked.load(Ordering::Relaxed),
            busy_time_us: self.busy_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of one worker's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerStatsSnapshot {
    /// Worker ID
    pub worker_id: usize,
    /// Jobs that returned `Ok(())`
    pub jobs_completed: u64,
    /// Jobs that returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Time spent running jobs (microseconds)
    pub busy_time_us: u64,
}

enum Outcome {
    Completed,
    Failed(JobError),
    Panicked(String),
}

/// Everything a worker loop is bound to
pub(crate) struct WorkerContext {
    pub jobs: Receiver<BoxedJob>,
    pub errors: Sender<JobError>,
    pub error_policy: ErrorPolicy,
    pub guard: CompletionGuard,
    /// Dropped once the loop is about to wait for its first job
    pub ready: WaitGroup,
}

/// A worker thread that pulls jobs from the pool's job queue
#[derive(Debug)]
pub(crate) struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker thread named `name`.
    ///
    /// The thread exits once the job queue is closed; its completion guard is
    /// released on the way out.
    pub(crate) fn spawn(id: usize, name: String, ctx: WorkerContext) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || Self::run(id, ctx, stats_clone))
            .map_err(|e| PoolError::spawn_with_source(id, e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// ID of the worker's thread, `None` once joined
    pub(crate) fn thread_id(&self) -> Option<thread::ThreadId> {
        self.thread.as_ref().map(|t| t.thread().id())
    }

    /// Get worker statistics
    pub(crate) fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Join the worker thread
    pub(crate) fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|payload| PoolError::join(self.id, panic_message(payload.as_ref())))?;
        }
        Ok(())
    }

    /// Main worker loop: wait for a job, run it, forward any failure, repeat
    /// until the job queue is closed.
    fn run(id: usize, ctx: WorkerContext, stats: Arc<WorkerStats>) {
        let WorkerContext {
            jobs,
            errors,
            error_policy,
            guard,
            ready,
        } = ctx;
        let _guard = guard;

        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _enter = worker_span.enter();

        log::debug!("worker {} started", id);
        drop(ready);

        // recv fails only once every sender is gone, i.e. the pool closed the queue
        while let Ok(job) = jobs.recv() {
            if let Some(failure) = Self::execute_job(id, job, &stats) {
                Self::report(id, failure, &errors, error_policy);
            }
        }

        log::debug!(
            "worker {} exiting after {} jobs ({} failed, {} panicked)",
            id,
            stats.jobs_run(),
            stats.jobs_failed.load(Ordering::Relaxed),
            stats.jobs_panicked.load(Ordering::Relaxed)
        );
    }

    /// Run a single job with panic protection.
    ///
    /// The job is dropped inside the guarded region, so a panicking `Drop` is
    /// reported like a panicking `run`.
    fn execute_job(id: usize, job: BoxedJob, stats: &WorkerStats) -> Option<JobError> {
        let name = job.name().to_string();

        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job", name = name.as_str());
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        let start = Instant::now();
        let outcome = match catch_unwind(AssertUnwindSafe(move || {
            let mut job = job;
            let result = job.run();
            drop(job);
            result
        })) {
            Ok(Ok(())) => Outcome::Completed,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
        };
        let elapsed = start.elapsed();
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        stats.record(&outcome, elapsed_us);

        log::trace!("worker {} ran {} in {}us", id, name, elapsed_us);

        match outcome {
            Outcome::Completed => None,
            Outcome::Failed(e) => Some(e),
            Outcome::Panicked(message) => Some(JobError::panicked(id, message)),
        }
    }

    /// Hand a failure to the error queue, blocking as the policy dictates
    fn report(id: usize, failure: JobError, errors: &Sender<JobError>, policy: ErrorPolicy) {
        if !policy.forwards() {
            log::warn!("worker {}: job failed: {}", id, failure);
            return;
        }

        if let Err(SendError(failure)) = errors.send(failure) {
            log::warn!(
                "worker {}: error queue is gone, discarding failure: {}",
                id,
                failure
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
