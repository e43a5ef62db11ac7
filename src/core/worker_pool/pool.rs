//! `WorkerPool` lifecycle and the submission protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WorkerPoolConfig;
use crate::core::error::PoolError;
use crate::core::job::{BoxedJob, JobFactory};
use crate::core::registry::JobRegistry;
use crate::runtime::TokioSpawner;

use super::worker::{idle_monitor, worker_loop, WorkerState};
use super::{ActiveJobGuard, PoolCounters, PoolStats, QueuedJob};

/// Per-run state, replaced on every start.
struct Lifecycle<T> {
    /// Sender side of the job queue. Taking it closes the queue.
    job_tx: Option<flume::Sender<QueuedJob<T>>>,
    /// Cancellation shared by the workers and jobs of this run.
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    started_at: Option<Instant>,
}

/// State shared by every `WorkerPool` handle.
pub(super) struct PoolShared<C, T> {
    config: WorkerPoolConfig,
    registry: JobRegistry<C, T>,
    running: Arc<AtomicBool>,
    counters: Arc<PoolCounters>,
    results_tx: flume::Sender<T>,
    results_rx: flume::Receiver<T>,
    errors_tx: flume::Sender<anyhow::Error>,
    errors_rx: flume::Receiver<anyhow::Error>,
    lifecycle: Mutex<Lifecycle<T>>,
    spawner: Option<TokioSpawner>,
}

/// Pool of worker tasks executing named jobs.
///
/// `C` is the caller's invocation context, handed untouched to job factories.
/// `T` is the value jobs produce. Handles are cheap to clone and all refer to
/// the same pool.
///
/// # Design
///
/// - **Lazy start**: constructed dormant; the first `start` or `submit` spawns workers
/// - **Lock-free flags**: running state and counters are atomics
/// - **Shared outcomes**: one results queue and one errors queue serve every submission
pub struct WorkerPool<C, T> {
    shared: Arc<PoolShared<C, T>>,
}

impl<C, T> Clone for WorkerPool<C, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C, T> WorkerPool<C, T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    /// Create a dormant pool. No tasks are spawned until `start` or `submit`.
    ///
    /// Workers are spawned on the Tokio runtime that is current when the pool
    /// starts.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        Self::build(config, None)
    }

    /// Create a dormant pool whose tasks run on the given spawner's runtime.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn with_spawner(config: WorkerPoolConfig, spawner: TokioSpawner) -> Result<Self, PoolError> {
        Self::build(config, Some(spawner))
    }

    fn build(config: WorkerPoolConfig, spawner: Option<TokioSpawner>) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (results_tx, results_rx) = flume::bounded(config.result_queue_capacity);
        let (errors_tx, errors_rx) = flume::bounded(config.error_queue_capacity);

        debug!(
            pool = %config.name,
            worker_count = config.worker_count,
            job_queue_capacity = config.job_queue_capacity,
            "WorkerPool created (dormant)"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                config,
                registry: JobRegistry::new(),
                running: Arc::new(AtomicBool::new(false)),
                counters: Arc::new(PoolCounters::default()),
                results_tx,
                results_rx,
                errors_tx,
                errors_rx,
                lifecycle: Mutex::new(Lifecycle {
                    job_tx: None,
                    token: CancellationToken::new(),
                    workers: Vec::new(),
                    started_at: None,
                }),
                spawner,
            }),
        })
    }

    /// Register `factory` under `name`.
    ///
    /// Registering an existing name replaces its factory. Callers that rely on
    /// a single registration must enforce uniqueness themselves.
    pub fn register_job<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(C) -> BoxedJob<T> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.shared.registry.register(name.clone(), factory) {
            debug!(job = %name, "Replaced existing job factory");
        }
    }

    /// Register an already shared factory under `name`.
    pub fn register_factory(&self, name: impl Into<String>, factory: JobFactory<C, T>) {
        self.shared.registry.insert(name, factory);
    }

    /// Build the job registered as `name` from `ctx`, run it on the pool, and
    /// wait for an outcome.
    ///
    /// Starts the pool first if it is not running. Waits while the job queue
    /// is full.
    ///
    /// The outcome comes from the pool's shared completion queues; with
    /// several submissions in flight it may belong to a different job than
    /// the one this call enqueued.
    ///
    /// # Errors
    ///
    /// - `PoolError::JobNotFound` if `name` was never registered
    /// - `PoolError::Execution` carrying the job's own error, unchanged
    /// - `PoolError::QueueClosed` if every worker of the current run has exited
    /// - `PoolError::Shutdown` if the pool stopped before an outcome arrived
    /// - `PoolError::NoRuntime` if the pool had to start outside a Tokio runtime
    pub async fn submit(&self, ctx: C, name: &str) -> Result<T, PoolError> {
        if !self.is_running() {
            self.start()?;
        }

        let factory = self
            .shared
            .registry
            .get(name)
            .ok_or_else(|| PoolError::JobNotFound { name: name.to_string() })?;

        let _active = ActiveJobGuard::enter(&self.shared.counters);
        let submission_id = Uuid::new_v4();
        let job = factory(ctx);

        let (job_tx, token) = self.shared.enqueue_handles()?;
        let queued = QueuedJob {
            job,
            name: name.to_string(),
            submission_id,
        };

        tokio::select! {
            biased;
            () = token.cancelled() => return Err(PoolError::Shutdown),
            sent = job_tx.send_async(queued) => {
                if sent.is_err() {
                    return Err(if token.is_cancelled() {
                        PoolError::Shutdown
                    } else {
                        PoolError::QueueClosed
                    });
                }
            }
        }
        drop(job_tx);

        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(job = name, %submission_id, "Job enqueued");

        tokio::select! {
            biased;
            Ok(value) = self.shared.results_rx.recv_async() => Ok(value),
            Ok(err) = self.shared.errors_rx.recv_async() => Err(PoolError::Execution(err)),
            () = token.cancelled() => Err(PoolError::Shutdown),
        }
    }

    /// Spawn the worker tasks. A no-op if the pool is already running.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::NoRuntime` if no spawner was configured and no
    /// Tokio runtime is current.
    pub fn start(&self) -> Result<(), PoolError> {
        let mut lifecycle = self.shared.lifecycle.lock();
        self.shared.start_locked(&mut lifecycle)
    }

    /// Close the job queue, cancel running jobs, and wait for every worker
    /// task to exit. A no-op if the pool is not running.
    ///
    /// Jobs still queued are dropped; their submitters get
    /// `PoolError::Shutdown`. Must not be awaited from inside a job, since the
    /// calling worker would wait on itself.
    pub async fn stop(&self) {
        let stopped = {
            let mut lifecycle = self.shared.lifecycle.lock();
            self.shared.stop_locked(&mut lifecycle)
        };
        if let Some(workers) = stopped {
            join_workers(workers).await;
            info!(pool = %self.shared.config.name, "Worker pool stopped");
        }
    }

    /// Whether worker tasks are running.
    ///
    /// A run cancelled by a panicking job reports `false`; the next `start`
    /// or `submit` replaces it.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire) && !self.shared.lifecycle.lock().token.is_cancelled()
    }

    /// Submissions currently waiting for an outcome.
    #[must_use]
    pub fn active_jobs(&self) -> u64 {
        self.shared.counters.active_jobs()
    }

    /// Whether a factory is registered under `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.shared.registry.contains(name)
    }

    /// Registered job names, sorted.
    #[must_use]
    pub fn registered_jobs(&self) -> Vec<String> {
        self.shared.registry.names()
    }

    /// The configuration this pool was built with.
    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.shared.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(
            self.shared.config.worker_count,
            self.is_running(),
            self.shared.registry.len(),
        )
    }
}

impl<C, T> PoolShared<C, T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    fn resolve_spawner(&self) -> Result<TokioSpawner, PoolError> {
        match &self.spawner {
            Some(spawner) => Ok(spawner.clone()),
            None => TokioSpawner::try_current().ok_or(PoolError::NoRuntime),
        }
    }

    /// Start under the lifecycle lock. The compare-and-swap on `running` keeps
    /// repeated starts from spawning extra workers.
    fn start_locked(self: &Arc<Self>, lifecycle: &mut Lifecycle<T>) -> Result<(), PoolError> {
        if self.running.load(Ordering::Acquire) && !lifecycle.token.is_cancelled() {
            return Ok(());
        }
        let spawner = self.resolve_spawner()?;
        if let Some(stale) = self.stop_locked(lifecycle) {
            // Still flagged running with a cancelled token: a job panicked.
            // Its workers are already exiting, so they are detached.
            warn!(
                pool = %self.config.name,
                stale_workers = stale.len(),
                "Replacing run cancelled by a panicking job"
            );
            drop(stale);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let (job_tx, job_rx) = flume::bounded(self.config.job_queue_capacity);
        let token = CancellationToken::new();

        let workers = (0..self.config.worker_count)
            .map(|worker_id| {
                let state = WorkerState {
                    job_rx: job_rx.clone(),
                    results_tx: self.results_tx.clone(),
                    errors_tx: self.errors_tx.clone(),
                    running: Arc::clone(&self.running),
                    counters: Arc::clone(&self.counters),
                    token: token.clone(),
                };
                spawner.spawn(worker_loop(worker_id, state))
            })
            .collect();

        lifecycle.job_tx = Some(job_tx);
        lifecycle.token = token.clone();
        lifecycle.workers = workers;
        lifecycle.started_at = Some(Instant::now());

        if let Some(interval) = self.config.idle_check_interval() {
            // Detached: exits on its own once this run's token is cancelled.
            drop(spawner.spawn(idle_monitor(
                Arc::downgrade(self),
                token,
                interval,
                self.config.idle_min_uptime(),
            )));
        }

        info!(
            pool = %self.config.name,
            worker_count = self.config.worker_count,
            job_queue_capacity = self.config.job_queue_capacity,
            idle_shutdown = self.config.idle_check_interval_ms.is_some(),
            "Worker pool started"
        );
        Ok(())
    }

    /// Stop under the lifecycle lock, returning the worker handles to join
    /// once the lock is released. `None` if the pool was not running.
    fn stop_locked(&self, lifecycle: &mut Lifecycle<T>) -> Option<Vec<JoinHandle<()>>> {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        // `take` closes the queue exactly once per run.
        drop(lifecycle.job_tx.take());
        lifecycle.token.cancel();
        lifecycle.started_at = None;

        debug!(pool = %self.config.name, "Job queue closed, workers cancelled");
        Some(std::mem::take(&mut lifecycle.workers))
    }

    /// Sender and token of the current run, restarting the pool if it was
    /// stopped since the caller last looked.
    ///
    /// Taken under the lifecycle lock after the caller has raised the
    /// active-job counter, so the idle monitor cannot stop the run in between.
    fn enqueue_handles(
        self: &Arc<Self>,
    ) -> Result<(flume::Sender<QueuedJob<T>>, CancellationToken), PoolError> {
        let mut lifecycle = self.lifecycle.lock();
        self.start_locked(&mut lifecycle)?;
        let job_tx = lifecycle.job_tx.clone().ok_or(PoolError::QueueClosed)?;
        Ok((job_tx, lifecycle.token.clone()))
    }

    /// Stop the run owning `token` if nothing is in flight and it has run for
    /// at least `min_uptime`. Returns `true` if this call stopped it.
    pub(super) async fn stop_if_idle(&self, token: &CancellationToken, min_uptime: Duration) -> bool {
        let workers = {
            let mut lifecycle = self.lifecycle.lock();
            // Every stop cancels its run's token under this lock, so a
            // cancelled token means a later run may own the lifecycle now.
            if token.is_cancelled() {
                return false;
            }
            let idle = self.counters.active_jobs() == 0;
            let warmed_up = lifecycle
                .started_at
                .is_some_and(|started| started.elapsed() >= min_uptime);
            if !(idle && warmed_up) {
                return false;
            }
            match self.stop_locked(&mut lifecycle) {
                Some(workers) => workers,
                None => return false,
            }
        };

        join_workers(workers).await;
        info!(pool = %self.config.name, "Worker pool stopped after going idle");
        true
    }
}

impl<C, T> Drop for PoolShared<C, T> {
    fn drop(&mut self) {
        // Signal shutdown but don't join: the last handle may be dropped
        // outside of any runtime.
        let lifecycle = self.lifecycle.get_mut();
        if self.running.swap(false, Ordering::AcqRel) {
            lifecycle.job_tx = None;
            lifecycle.token.cancel();
            debug!(pool = %self.config.name, "WorkerPool dropped while running - workers detached");
        }
    }
}

async fn join_workers(workers: Vec<JoinHandle<()>>) {
    let worker_count = workers.len();
    for (worker_id, worker) in workers.into_iter().enumerate() {
        match worker.await {
            Ok(()) => debug!(worker_id, "Worker joined"),
            Err(err) if err.is_panic() => warn!(worker_id, "Worker panicked"),
            Err(err) => warn!(worker_id, error = %err, "Worker task aborted"),
        }
    }
    debug!(worker_count, "All workers joined");
}
