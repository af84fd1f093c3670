//! Worker pool implementation

use crate::core::{BoxedJob, ClosureJob, Job, JobError, PoolError, Result};
use crate::pool::config::PoolConfig;
use crate::pool::tracker::CompletionTracker;
use crate::pool::worker::{Worker, WorkerContext, WorkerStats, WorkerStatsSnapshot};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::sync::WaitGroup;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often a dropping pool empties the error queue while waiting for its workers
const DROP_DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Serializable snapshot of a pool's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Per-worker counters, ordered by worker ID
    pub workers: Vec<WorkerStatsSnapshot>,
    /// Jobs that returned `Ok(())`
    pub jobs_completed: u64,
    /// Jobs that returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Time spent running jobs across all workers (microseconds)
    pub busy_time_us: u64,
}

impl PoolStats {
    fn collect(stats: &[Arc<WorkerStats>]) -> Self {
        let workers: Vec<_> = stats
            .iter()
            .enumerate()
            .map(|(id, s)| s.snapshot(id))
            .collect();
        Self {
            jobs_completed: workers.iter().map(|w| w.jobs_completed).sum(),
            jobs_failed: workers.iter().map(|w| w.jobs_failed).sum(),
            jobs_panicked: workers.iter().map(|w| w.jobs_panicked).sum(),
            busy_time_us: workers.iter().map(|w| w.busy_time_us).sum(),
            workers,
        }
    }

    /// Total jobs run, whatever their outcome
    pub fn jobs_run(&self) -> u64 {
        self.jobs_completed + self.jobs_failed + self.jobs_panicked
    }
}

/// A fixed-size pool of worker threads fed through a rendezvous job queue
///
/// # Handoff
///
/// The job queue has no capacity: [`request`](Self::request) returns only once an
/// idle worker has taken the job. Failures travel back through a separate error
/// queue read with [`errors`](Self::errors); its buffering is set by
/// [`ErrorPolicy`](crate::pool::ErrorPolicy).
///
/// # Shutdown Mechanism
///
/// [`shutdown`](Self::shutdown) closes the job queue, which every idle worker
/// observes on its next receive, then blocks until every worker has exited.
///
/// # Example
///
/// ```rust
/// use workerpool::prelude::*;
///
/// let pool = WorkerPool::new(2).unwrap();
/// pool.execute(|| Ok(()));
/// pool.execute(|| Err(JobError::msg("disk full")));
///
/// assert_eq!(pool.errors().to_string(), "disk full");
/// pool.shutdown();
/// ```
pub struct WorkerPool {
    config: PoolConfig,
    jobs: RwLock<Option<Sender<BoxedJob>>>,
    errors: Receiver<JobError>,
    tracker: CompletionTracker,
    workers: Mutex<Vec<Worker>>,
    stats: Vec<Arc<WorkerStats>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("live_workers", &self.live_workers())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool of `workers` threads and start them.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `workers` is 0
    /// - `PoolError::Spawn` if a worker thread could not be started
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(workers))
    }

    /// Create a pool with custom configuration and start its workers.
    ///
    /// On return every worker loop is running and waiting for a job. If a thread
    /// fails to spawn, the workers started so far are stopped and joined before the
    /// error is returned.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let (job_tx, job_rx) = channel::bounded::<BoxedJob>(0);
        let (err_tx, err_rx) = match config.error_policy.capacity(config.workers) {
            Some(capacity) => channel::bounded(capacity),
            None => channel::unbounded(),
        };
        let tracker = CompletionTracker::new(config.workers);
        let ready = WaitGroup::new();

        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let ctx = WorkerContext {
                jobs: job_rx.clone(),
                errors: err_tx.clone(),
                error_policy: config.error_policy,
                guard: tracker.guard(),
                ready: ready.clone(),
            };
            let name = format!("{}-{}", config.thread_name_prefix, id);

            match Worker::spawn(id, name, ctx) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    log::error!("{}; stopping {} started workers", e, workers.len());
                    drop(job_tx);
                    for worker in workers {
                        if let Err(join_err) = worker.join() {
                            log::error!("{}", join_err);
                        }
                    }
                    return Err(e);
                }
            }
        }
        ready.wait();

        log::debug!(
            "worker pool '{}' started with {} workers ({:?} error queue)",
            config.thread_name_prefix,
            config.workers,
            config.error_policy
        );

        let stats = workers.iter().map(Worker::stats).collect();
        Ok(Self {
            config,
            jobs: RwLock::new(Some(job_tx)),
            errors: err_rx,
            tracker,
            workers: Mutex::new(workers),
            stats,
        })
    }

    /// Hand `job` to an idle worker, blocking until one accepts it.
    ///
    /// # Panics
    ///
    /// Panics if the pool has been shut down. Use [`submit`](Self::submit) to get an
    /// error instead.
    pub fn request<J: Job + 'static>(&self, job: J) {
        if let Err(e) = self.submit(job) {
            panic!("request on worker pool '{}': {}", self.config.thread_name_prefix, e);
        }
    }

    /// Hand `job` to an idle worker, blocking until one accepts it.
    ///
    /// # Errors
    ///
    /// - `PoolError::ShutDown` - the pool has been shut down
    pub fn submit<J: Job + 'static>(&self, job: J) -> Result<()> {
        // Clone the sender so the lock is not held across the blocking send
        let sender = self
            .jobs
            .read()
            .as_ref()
            .cloned()
            .ok_or(PoolError::ShutDown)?;

        sender
            .send(Box::new(job))
            .map_err(|_| PoolError::ShutDown)
    }

    /// Submit a closure as a job
    ///
    /// # Panics
    ///
    /// Panics if the pool has been shut down.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() -> std::result::Result<(), JobError> + Send + 'static,
    {
        self.request(ClosureJob::new(f))
    }

    /// Submit a job that runs inside the caller's current tracing span
    #[cfg(feature = "tracing")]
    pub fn submit_traced<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.submit(crate::tracing::TracedJob::new(job))
    }

    /// Block until a worker reports a failure and return it.
    ///
    /// Failures arrive in the order workers push them and carry no reference to
    /// the job that produced them. Meant for a caller that knows a failure is
    /// coming; a thread that keeps draining errors across shutdown should use
    /// [`next_error`](Self::next_error) or [`error_iter`](Self::error_iter).
    ///
    /// # Panics
    ///
    /// Panics if every worker has exited and no failure is left, since none can
    /// ever arrive.
    pub fn errors(&self) -> JobError {
        match self.next_error() {
            Some(failure) => failure,
            None => panic!(
                "errors() on worker pool '{}': all workers exited and the error queue is empty",
                self.config.thread_name_prefix
            ),
        }
    }

    /// Block until a worker reports a failure.
    ///
    /// Returns `None` once every worker has exited and the error queue is empty.
    pub fn next_error(&self) -> Option<JobError> {
        self.errors.recv().ok()
    }

    /// Blocking iterator over failures that ends once every worker has exited
    /// and the error queue is empty.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::thread;
    /// use workerpool::prelude::*;
    ///
    /// let pool = Arc::new(WorkerPool::new(2).unwrap());
    /// let drainer = {
    ///     let pool = Arc::clone(&pool);
    ///     thread::spawn(move || pool.error_iter().map(|e| e.to_string()).collect::<Vec<_>>())
    /// };
    ///
    /// pool.execute(|| Err(JobError::msg("disk full")));
    /// pool.shutdown();
    ///
    /// assert_eq!(drainer.join().unwrap(), vec!["disk full"]);
    /// ```
    pub fn error_iter(&self) -> impl Iterator<Item = JobError> + '_ {
        self.errors.iter()
    }

    /// Take a failure if one is ready, without blocking
    pub fn try_errors(&self) -> Option<JobError> {
        self.errors.try_recv().ok()
    }

    /// Wait up to `timeout` for a failure
    pub fn errors_timeout(&self, timeout: Duration) -> Option<JobError> {
        self.errors.recv_timeout(timeout).ok()
    }

    /// Take every failure that is ready right now
    pub fn drain_errors(&self) -> Vec<JobError> {
        self.errors.try_iter().collect()
    }

    /// Close the job queue and block until every worker has exited.
    ///
    /// Does not drain the error queue. With
    /// [`ErrorPolicy::Handoff`](crate::pool::ErrorPolicy::Handoff), a worker
    /// blocked on reporting a failure keeps this call waiting until another thread
    /// receives it, typically through [`error_iter`](Self::error_iter).
    ///
    /// Called from one of the pool's own jobs, it waits for every other worker and
    /// leaves the calling worker to exit once its job returns.
    ///
    /// # Panics
    ///
    /// Panics if the pool was already shut down.
    pub fn shutdown(&self) {
        if let Err(e) = self.try_shutdown() {
            panic!("shutdown of worker pool '{}': {}", self.config.thread_name_prefix, e);
        }
    }

    /// Like [`shutdown`](Self::shutdown), but reports misuse as an error.
    ///
    /// # Errors
    ///
    /// - `PoolError::ShutDown` - the pool was already shut down
    /// - `PoolError::Join` - a worker thread panicked outside of a job
    pub fn try_shutdown(&self) -> Result<()> {
        let sender = self.jobs.write().take().ok_or(PoolError::ShutDown)?;
        // Dropping the last sender disconnects every worker's receiver
        drop(sender);

        log::debug!(
            "worker pool '{}' closed its job queue, waiting for {} workers",
            self.config.thread_name_prefix,
            self.tracker.remaining()
        );
        let (current, others) = split_current(std::mem::take(&mut *self.workers.lock()));
        self.tracker.wait_at_most(usize::from(current.is_some()));

        let mut first_err = None;
        for worker in others {
            let id = worker.id();
            if let Err(e) = worker.join() {
                log::error!("{}", e);
                first_err.get_or_insert(e);
            } else {
                log::trace!("joined worker {}", id);
            }
        }
        if let Some(worker) = current {
            log::debug!(
                "worker {} shut down its own pool, leaving it to exit after its job",
                worker.id()
            );
        }

        let stats = self.stats();
        log::debug!(
            "worker pool '{}' shut down: {} jobs completed, {} failed, {} panicked",
            self.config.thread_name_prefix,
            stats.jobs_completed,
            stats.jobs_failed,
            stats.jobs_panicked
        );

        first_err.map_or(Ok(()), Err)
    }

    /// Number of worker threads, fixed at construction
    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    /// Number of worker loops that have not exited yet
    pub fn live_workers(&self) -> usize {
        self.tracker.remaining()
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.jobs.read().is_none()
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Snapshot of per-worker and total job counters
    pub fn stats(&self) -> PoolStats {
        PoolStats::collect(&self.stats)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let Some(sender) = self.jobs.get_mut().take() else {
            return;
        };
        drop(sender);

        // The last handle may be released by one of our own jobs, whose worker
        // cannot exit until this returns
        let (current, others) = split_current(std::mem::take(self.workers.get_mut()));
        let running_here = usize::from(current.is_some());

        // Nobody can call errors() on a pool being dropped, so unread failures
        // must be taken here or a handoff worker would never exit.
        while !self
            .tracker
            .wait_at_most_timeout(running_here, DROP_DRAIN_INTERVAL)
        {
            for failure in self.errors.try_iter() {
                log::warn!(
                    "worker pool '{}' dropped with an unread failure: {}",
                    self.config.thread_name_prefix,
                    failure
                );
            }
        }

        for worker in others {
            if let Err(e) = worker.join() {
                log::error!("{}", e);
            }
        }
        if let Some(worker) = current {
            log::debug!(
                "worker pool '{}' dropped by its own worker {}, detaching it",
                self.config.thread_name_prefix,
                worker.id()
            );
        }
    }
}

/// Separate the worker running on the calling thread, if any, from the rest
fn split_current(workers: Vec<Worker>) -> (Option<Worker>, Vec<Worker>) {
    let current = thread::current().id();
    let mut own = None;
    let mut others = Vec::with_capacity(workers.len());
    for worker in workers {
        if worker.thread_id() == Some(current) {
            own = Some(worker);
        } else {
            others.push(worker);
        }
    }
    (own, others)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ErrorPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_worker_pool_creation() {
        let pool = WorkerPool::new(4).expect("Failed to create worker pool");
        assert_eq!(pool.worker_count(), 4);
        assert_eq!(pool.live_workers(), 4);
        assert!(!pool.is_shut_down());

        pool.shutdown();
        assert!(pool.is_shut_down());
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerPool::new(0);
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
    }

    #[test]
    fn test_thread_names() {
        let config = PoolConfig::new(1).with_thread_name_prefix("ingest");
        let pool = WorkerPool::with_config(config).expect("Failed to create worker pool");

        let (tx, rx) = channel::bounded(1);
        pool.execute(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).map_err(|e| JobError::msg(e.to_string()))
        });

        let name = rx.recv_timeout(Duration::from_secs(1)).expect("job ran");
        assert_eq!(name.as_deref(), Some("ingest-0"));
        pool.shutdown();
    }

    #[test]
    fn test_job_execution() {
        let pool = WorkerPool::new(2).expect("Failed to create worker pool");
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter_clone = Arc::clone(&counter);
            pool.execute(move || {
                counter_clone.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
        }

        pool.shutdown();

        assert_eq!(counter.load(Ordering::Relaxed), 10);
        let stats = pool.stats();
        assert_eq!(stats.jobs_completed, 10);
        assert_eq!(stats.workers.len(), 2);
    }

    #[test]
    fn test_request_blocks_until_worker_accepts() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");

        pool.execute(|| {
            thread::sleep(Duration::from_millis(100));
            Ok(())
        });

        // The only worker is busy, so the second handoff waits for it
        let start = Instant::now();
        pool.execute(|| Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(50));

        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown() {
        let pool = WorkerPool::new(2).expect("Failed to create worker pool");
        pool.shutdown();

        let result = pool.submit(ClosureJob::new(|| Ok(())));
        assert!(matches!(result, Err(PoolError::ShutDown)));
    }

    #[test]
    #[should_panic(expected = "shut down")]
    fn test_request_after_shutdown_panics() {
        let pool = WorkerPool::new(2).expect("Failed to create worker pool");
        pool.shutdown();
        pool.execute(|| Ok(()));
    }

    #[test]
    #[should_panic(expected = "shut down")]
    fn test_double_shutdown_panics() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn test_try_shutdown_twice() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        assert!(pool.try_shutdown().is_ok());
        assert!(matches!(pool.try_shutdown(), Err(PoolError::ShutDown)));
    }

    #[test]
    fn test_error_handling() {
        let config = PoolConfig::new(2).with_error_policy(ErrorPolicy::Unbounded);
        let pool = WorkerPool::with_config(config).expect("Failed to create worker pool");

        for i in 0..10 {
            pool.execute(move || {
                if i % 2 == 0 {
                    Err(JobError::msg(format!("job {} failed", i)))
                } else {
                    Ok(())
                }
            });
        }

        pool.shutdown();

        let failures = pool.drain_errors();
        assert_eq!(failures.len(), 5);

        let stats = pool.stats();
        assert_eq!(stats.jobs_completed, 5);
        assert_eq!(stats.jobs_failed, 5);
        assert_eq!(stats.jobs_run(), 10);
    }

    #[test]
    fn test_try_errors_empty() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        assert!(pool.try_errors().is_none());
        assert!(pool.errors_timeout(Duration::from_millis(10)).is_none());
        pool.shutdown();
    }

    #[test]
    #[should_panic(expected = "error queue is empty")]
    fn test_errors_after_shutdown_panics() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        pool.shutdown();
        let _ = pool.errors();
    }

    #[test]
    fn test_drop_discards_unread_handoff_failure() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        pool.execute(|| Err(JobError::msg("never read")));

        let start = Instant::now();
        drop(pool);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_next_error_after_shutdown_is_none() {
        let config = PoolConfig::new(1).with_error_policy(ErrorPolicy::PerWorker);
        let pool = WorkerPool::with_config(config).expect("Failed to create worker pool");
        pool.execute(|| Err(JobError::msg("buffered")));
        pool.shutdown();

        assert_eq!(pool.next_error().map(|e| e.to_string()).as_deref(), Some("buffered"));
        assert!(pool.next_error().is_none());
        assert_eq!(pool.error_iter().count(), 0);
    }

    #[test]
    fn test_shutdown_from_own_job() {
        let pool = Arc::new(WorkerPool::new(2).expect("Failed to create worker pool"));
        let (tx, rx) = channel::bounded(1);

        let handle = Arc::clone(&pool);
        pool.execute(move || {
            let result = handle.try_shutdown();
            tx.send(result.is_ok()).map_err(|e| JobError::msg(e.to_string()))
        });

        let shut_down = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("shutdown from a job must not wait on its own worker");
        assert!(shut_down);
        assert!(pool.is_shut_down());
        assert!(pool.tracker.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_drop_on_own_worker_thread() {
        let pool = Arc::new(WorkerPool::new(2).expect("Failed to create worker pool"));
        let tracker = pool.tracker.clone();
        let (tx, rx) = channel::bounded(1);

        let last = Arc::clone(&pool);
        pool.execute(move || {
            thread::sleep(Duration::from_millis(50));
            drop(last);
            tx.send(()).map_err(|e| JobError::msg(e.to_string()))
        });
        drop(pool);

        rx.recv_timeout(Duration::from_secs(5))
            .expect("dropping the last handle inside a job must return");
        assert!(tracker.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_stats_serialize() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        pool.execute(|| Ok(()));
        pool.shutdown();

        let json = serde_json::to_value(pool.stats()).expect("stats serialize");
        assert_eq!(json["jobs_completed"], 1);
        assert_eq!(json["workers"][0]["worker_id"], 0);
    }

    #[test]
    fn test_debug_output() {
        let pool = WorkerPool::new(1).expect("Failed to create worker pool");
        let debug = format!("{:?}", pool);
        assert!(debug.contains("live_workers: 1"));
        pool.shutdown();
    }
}
