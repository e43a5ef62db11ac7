//! Worker task loop and the idle monitor.

use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::core::job::JobContext;

use super::pool::PoolShared;
use super::{PoolCounters, QueuedJob};

/// Everything one worker task needs from its pool.
///
/// Workers hold no reference to the pool itself, so dropping the last pool
/// handle still tears the run down.
pub(super) struct WorkerState<T> {
    pub job_rx: flume::Receiver<QueuedJob<T>>,
    pub results_tx: flume::Sender<T>,
    pub errors_tx: flume::Sender<anyhow::Error>,
    pub running: Arc<AtomicBool>,
    pub counters: Arc<PoolCounters>,
    pub token: CancellationToken,
}

impl<T: Send + 'static> WorkerState<T> {
    /// Push an outcome onto the matching completion queue, unless the pool is
    /// stopping.
    async fn deliver(&self, worker_id: usize, job: &str, submission_id: Uuid, outcome: anyhow::Result<T>) {
        match &outcome {
            Ok(_) => self.counters.succeeded.fetch_add(1, Ordering::Relaxed),
            Err(err) => {
                warn!(worker_id, job, %submission_id, error = %err, "Job failed");
                self.counters.failed.fetch_add(1, Ordering::Relaxed)
            }
        };

        if !self.running.load(Ordering::Acquire) {
            self.drop_outcome(worker_id, submission_id);
            return;
        }

        let delivered = match outcome {
            Ok(value) => tokio::select! {
                biased;
                sent = self.results_tx.send_async(value) => sent.is_ok(),
                () = self.token.cancelled() => false,
            },
            Err(err) => tokio::select! {
                biased;
                sent = self.errors_tx.send_async(err) => sent.is_ok(),
                () = self.token.cancelled() => false,
            },
        };

        if !delivered {
            self.drop_outcome(worker_id, submission_id);
        }
    }

    fn drop_outcome(&self, worker_id: usize, submission_id: Uuid) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        debug!(worker_id, %submission_id, "Pool stopping, outcome dropped");
    }
}

/// Run jobs from the queue one at a time until the queue closes or the run is
/// cancelled.
///
/// A panicking job cancels the whole run before the panic resumes, so every
/// submitter still waiting is released with a shutdown and the next `submit`
/// starts a fresh run.
pub(super) async fn worker_loop<T: Send + 'static>(worker_id: usize, state: WorkerState<T>) {
    debug!(worker_id, "Worker task started");

    loop {
        let queued = tokio::select! {
            biased;
            () = state.token.cancelled() => {
                debug!(worker_id, "Worker cancelled, exiting");
                break;
            }
            next = state.job_rx.recv_async() => match next {
                Ok(queued) => queued,
                Err(_) => {
                    debug!(worker_id, "Job queue closed, exiting");
                    break;
                }
            },
        };

        let QueuedJob {
            job,
            name,
            submission_id,
        } = queued;

        trace!(worker_id, job = %name, %submission_id, "Worker executing job");
        let ctx = JobContext::new(state.token.clone(), worker_id, submission_id);
        let outcome = match AssertUnwindSafe(job.execute(&ctx)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!(worker_id, job = %name, %submission_id, "Job panicked, cancelling run");
                state.counters.failed.fetch_add(1, Ordering::Relaxed);
                state.token.cancel();
                resume_unwind(panic);
            }
        };
        state.deliver(worker_id, &name, submission_id, outcome).await;
    }

    debug!(worker_id, "Worker task exiting");
}

/// Stop the pool once nothing is in flight.
///
/// Checks the active-job counter every `period` and never re-joins workers on
/// its own; the stop it triggers joins them once. Exits when the run's token
/// is cancelled, whoever cancelled it.
pub(super) async fn idle_monitor<C, T>(
    pool: Weak<PoolShared<C, T>>,
    token: CancellationToken,
    period: Duration,
    min_uptime: Duration,
) where
    C: Send + 'static,
    T: Send + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(pool) = pool.upgrade() else {
            break;
        };
        if pool.stop_if_idle(&token, min_uptime).await {
            break;
        }
    }

    trace!("Idle monitor exiting");
}
