//! Error types for pool operations.

use thiserror::Error;

/// Errors surfaced by [`WorkerPool`](crate::core::WorkerPool) operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No factory is registered under the requested job name.
    #[error("job not found: {name}")]
    JobNotFound {
        /// The name passed to `submit`.
        name: String,
    },

    /// The error a job's `execute` returned, passed through untouched.
    ///
    /// Use [`anyhow::Error::downcast_ref`] to recover the original error type.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),

    /// The job queue was closed by `stop` before the job could be enqueued.
    ///
    /// This only happens when `submit` races a concurrent `stop`; callers must
    /// not submit while a stop is in progress.
    #[error("job queue is closed")]
    QueueClosed,

    /// The pool was stopped, or its run was cancelled by a panicking job,
    /// while the caller was waiting for an outcome.
    #[error("pool has been shut down")]
    Shutdown,

    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No Tokio runtime was available to launch worker tasks.
    #[error("no tokio runtime available to spawn workers")]
    NoRuntime,
}

impl PoolError {
    /// Returns `true` if this is a [`PoolError::JobNotFound`].
    #[must_use]
    pub const fn is_job_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound { .. })
    }

    /// Borrow the job's own error, if this is an execution failure.
    #[must_use]
    pub const fn execution_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Execution(err) => Some(err),
            _ => None,
        }
    }
}
