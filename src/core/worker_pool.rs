//! Lazily started worker pool running named jobs on Tokio tasks.
//!
//! The pool owns a fixed number of worker tasks that pull jobs from one bounded
//! job queue and push outcomes onto two bounded completion queues shared by
//! every submission: one for results, one for errors.
//!
//! # Key Features
//!
//! - **Lazy start**: the first `submit` starts the pool if it is dormant
//! - **Named jobs**: callers register factories up front and submit by name
//! - **Backpressure**: `submit` waits while the job queue is full
//! - **Opt-in idle shutdown**: a monitor stops the pool once nothing is in flight
//!
//! # Shared completion queues
//!
//! Outcomes are not correlated with the submission that produced them. When
//! several `submit` calls are in flight at once, each one returns *some*
//! outcome from the shared queues, not necessarily the outcome of its own job.
//! Every call still unblocks exactly once, and the total number of outcomes
//! matches the number of jobs run. Callers that need request/response pairing
//! must submit one job at a time or carry their own reply channel inside the
//! invocation context. Pairing inside the pool would mean replacing the two
//! shared queues with a per-submission oneshot reply carried on `QueuedJob`.
//!
//! # Example
//!
//! ```rust,ignore
//! use job_pool::config::WorkerPoolConfig;
//! use job_pool::core::{job_fn, BoxedJob, WorkerPool};
//!
//! let pool: WorkerPool<String, usize> =
//!     WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4))?;
//!
//! pool.register_job("length", |input: String| -> BoxedJob<usize> {
//!     Box::new(job_fn(move |_ctx| {
//!         let len = input.len();
//!         async move { Ok(len) }
//!     }))
//! });
//!
//! let len = pool.submit("hello".to_string(), "length").await?;
//! pool.stop().await;
//! ```

mod pool;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use super::job::BoxedJob;

pub use pool::WorkerPool;

/// Point-in-time view of pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured number of worker tasks.
    pub worker_count: usize,

    /// Whether the pool is currently running.
    pub running: bool,

    /// Submissions currently waiting for an outcome.
    pub active_jobs: u64,

    /// Jobs enqueued since the pool was created.
    pub submitted: u64,

    /// Jobs that returned a value.
    pub succeeded: u64,

    /// Jobs that returned an error.
    pub failed: u64,

    /// Outcomes discarded because the pool was stopping.
    pub dropped: u64,

    /// Number of registered job names.
    pub registered_jobs: usize,
}

/// Atomic counters behind [`PoolStats`].
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_jobs: AtomicU64,
    pub submitted: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub dropped: AtomicU64,
}

impl PoolCounters {
    /// Current number of submissions in flight.
    pub fn active_jobs(&self) -> u64 {
        self.active_jobs.load(Ordering::Acquire)
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, running: bool, registered_jobs: usize) -> PoolStats {
        PoolStats {
            worker_count,
            running,
            active_jobs: self.active_jobs(),
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            registered_jobs,
        }
    }
}

/// Holds one unit of the active-job counter for as long as it lives.
///
/// Released on every exit path of `submit`, including early returns and
/// cancellation of the submitting future.
pub(crate) struct ActiveJobGuard<'a> {
    counters: &'a PoolCounters,
}

impl<'a> ActiveJobGuard<'a> {
    pub fn enter(counters: &'a PoolCounters) -> Self {
        counters.active_jobs.fetch_add(1, Ordering::AcqRel);
        Self { counters }
    }
}

impl Drop for ActiveJobGuard<'_> {
    fn drop(&mut self) {
        self.counters.active_jobs.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A job on its way from `submit` to a worker.
pub(crate) struct QueuedJob<T> {
    pub job: BoxedJob<T>,
    pub name: String,
    pub submission_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.worker_count, 0);
        assert!(!stats.running);
        assert_eq!(stats.active_jobs, 0);
    }

    #[test]
    fn test_pool_counters_snapshot() {
        let counters = PoolCounters::default();
        counters.submitted.fetch_add(10, Ordering::Relaxed);
        counters.succeeded.fetch_add(7, Ordering::Relaxed);
        counters.failed.fetch_add(2, Ordering::Relaxed);

        let stats = counters.snapshot(4, true, 3);
        assert_eq!(stats.worker_count, 4);
        assert!(stats.running);
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.succeeded, 7);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.registered_jobs, 3);
    }

    #[test]
    fn test_active_job_guard_releases() {
        let counters = PoolCounters::default();
        {
            let _first = ActiveJobGuard::enter(&counters);
            let _second = ActiveJobGuard::enter(&counters);
            assert_eq!(counters.active_jobs(), 2);
        }
        assert_eq!(counters.active_jobs(), 0);
    }
}
