//! Tracing context propagation for jobs.
//!
//! With the `tracing` feature enabled, worker loops and job runs are wrapped in
//! `tracing` spans, and [`TracedJob`] carries the submitter's span onto the
//! worker thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use workerpool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("workerpool=debug".parse().unwrap()))
//!     .init();
//!
//! let pool = WorkerPool::new(4)?;
//! let span = tracing::info_span!("import", batch = 7);
//! let _enter = span.enter();
//! pool.submit_traced(MyJob::new())?;
//! ```

use crate::core::{Job, JobError};

/// A job wrapper that runs its inner job inside the span that was current when
/// the wrapper was created.
pub struct TracedJob<J: Job> {
    inner: J,
    span: tracing::Span,
}

impl<J: Job> TracedJob<J> {
    /// Wrap `job`, capturing the current span
    pub fn new(job: J) -> Self {
        Self {
            inner: job,
            span: tracing::Span::current(),
        }
    }

    /// Wrap `job` with an explicit span
    pub fn with_span(job: J, span: tracing::Span) -> Self {
        Self { inner: job, span }
    }
}

impl<J: Job> Job for TracedJob<J> {
    fn run(&mut self) -> Result<(), JobError> {
        let _guard = self.span.enter();
        self.inner.run()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureJob;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_traced_job_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let job = ClosureJob::new(move || {
            ran_clone.store(true, Ordering::SeqCst);
            Ok(())
        });

        let mut traced = TracedJob::new(job);
        traced.run().expect("Job should run");

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_traced_job_preserves_name_and_error() {
        let job = ClosureJob::with_name(|| Err(JobError::msg("disk full")), "Flush");
        let mut traced = TracedJob::with_span(job, tracing::info_span!("test"));

        assert_eq!(traced.name(), "Flush");
        let err = traced.run().expect_err("inner error passes through");
        assert_eq!(err.to_string(), "disk full");
    }
}
