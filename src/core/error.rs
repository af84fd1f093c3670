//! Error types for the worker pool

/// Boxed error type a job may fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while building or driving a worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    Spawn {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    Join {
        /// ID of the worker that failed to join
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// The pool has already been shut down
    #[error("Worker pool has been shut down")]
    ShutDown,
}

impl PoolError {
    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::Spawn {
            worker_id,
            message: message.into(),
            source: None,
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(worker_id: usize, source: std::io::Error) -> Self {
        PoolError::Spawn {
            worker_id,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::Join {
            worker_id,
            message: message.into(),
        }
    }
}

/// A failure reported by a job, delivered through the pool's error queue
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JobError {
    /// The job's `run` returned an error
    #[error(transparent)]
    Failed(BoxError),

    /// The job panicked and the worker caught it
    #[error("Job panicked on worker #{worker_id}: {message}")]
    Panicked {
        /// ID of the worker that ran the job
        worker_id: usize,
        /// Panic message
        message: String,
    },
}

impl JobError {
    /// Wrap any error value
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        JobError::Failed(Box::new(error))
    }

    /// Create a failure from a plain message
    pub fn msg<S: Into<String>>(msg: S) -> Self {
        let msg: String = msg.into();
        JobError::Failed(msg.into())
    }

    /// Create a panic report
    pub fn panicked(worker_id: usize, message: impl Into<String>) -> Self {
        JobError::Panicked {
            worker_id,
            message: message.into(),
        }
    }

    /// Whether this failure came from a caught panic
    pub fn is_panic(&self) -> bool {
        matches!(self, JobError::Panicked { .. })
    }

    /// Borrow the job's original error as a concrete type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            JobError::Failed(inner) => inner.downcast_ref::<E>(),
            JobError::Panicked { .. } => None,
        }
    }
}

impl From<BoxError> for JobError {
    fn from(error: BoxError) -> Self {
        JobError::Failed(error)
    }
}

impl From<std::io::Error> for JobError {
    fn from(error: std::io::Error) -> Self {
        JobError::new(error)
    }
}

impl From<String> for JobError {
    fn from(msg: String) -> Self {
        JobError::msg(msg)
    }
}

impl From<&str> for JobError {
    fn from(msg: &str) -> Self {
        JobError::msg(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PoolError::invalid_config("workers", "must be greater than 0");
        assert!(matches!(err, PoolError::InvalidConfig { .. }));

        let err = PoolError::join(3, "Worker panicked");
        assert!(matches!(err, PoolError::Join { worker_id: 3, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = PoolError::invalid_config("workers", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'workers': must be greater than 0"
        );

        assert_eq!(PoolError::ShutDown.to_string(), "Worker pool has been shut down");

        let err = JobError::panicked(2, "boom");
        assert_eq!(err.to_string(), "Job panicked on worker #2: boom");
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = PoolError::spawn_with_source(5, io_err);

        assert!(matches!(err, PoolError::Spawn { source: Some(_), .. }));
        assert!(err.to_string().contains("worker thread #5"));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_job_error_is_transparent() {
        let err = JobError::msg("disk full");
        assert_eq!(err.to_string(), "disk full");
        assert!(!err.is_panic());
    }

    #[test]
    fn test_job_error_downcast() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full");
        let err = JobError::from(io_err);

        let inner = err
            .downcast_ref::<std::io::Error>()
            .expect("io error should be preserved");
        assert_eq!(inner.kind(), std::io::ErrorKind::WriteZero);

        assert!(JobError::panicked(0, "x")
            .downcast_ref::<std::io::Error>()
            .is_none());
    }
}
