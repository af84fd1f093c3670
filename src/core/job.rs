//! Job trait and related types

use crate::core::error::JobError;
use std::fmt;

/// A unit of work handed to exactly one worker of the pool
pub trait Job: Send {
    /// Run the job
    ///
    /// # Errors
    ///
    /// Returns the failure that the pool forwards to its error queue
    fn run(&mut self) -> Result<(), JobError>;

    /// Name used when logging about this job
    fn name(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.name())
    }
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&mut self) -> Result<(), JobError> {
        (**self).run()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: FnOnce() -> Result<(), JobError> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: FnOnce() -> Result<(), JobError> + Send,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: FnOnce() -> Result<(), JobError> + Send,
{
    fn run(&mut self) -> Result<(), JobError> {
        match self.closure.take() {
            Some(closure) => closure(),
            None => Err(JobError::msg(format!("{}: closure already taken", self.name))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
