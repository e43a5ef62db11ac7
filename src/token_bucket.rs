//! Token bucket rate limiter
//!
//! A capped permit counter refilled by a background Tokio task. It is a
//! standalone primitive: callers consult it before submitting work, the pool
//! never does so on its own.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use job_pool::TokenBucket;
//!
//! let bucket = TokenBucket::new(5, 5, Duration::from_millis(100))?;
//! if bucket.take() {
//!     pool.submit(request, "export").await?;
//! }
//! bucket.stop();
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::TokenBucketConfig;
use crate::runtime::TokioSpawner;

/// Errors constructing a [`TokenBucket`].
#[derive(Debug, Error)]
pub enum TokenBucketError {
    /// Configuration validation failed.
    #[error("invalid token bucket configuration: {0}")]
    InvalidConfig(String),
    /// No Tokio runtime was available for the refill task.
    #[error("no tokio runtime available for the refill loop")]
    NoRuntime,
}

/// Token count plus the deadline of the next scheduled refill.
#[derive(Debug)]
struct Tokens {
    available: u64,
    next_refill: Instant,
}

/// Counter state shared with the refill task.
///
/// Refills follow a fixed schedule anchored at construction. Whoever touches
/// the counter first after a deadline (the refill task or a caller) applies
/// every refill that has come due, so a caller never observes a stale count
/// just because the refill task has not been polled yet.
#[derive(Debug)]
struct BucketState {
    tokens: Mutex<Tokens>,
    max_tokens: u64,
    refill_amount: u64,
    period: Duration,
}

impl BucketState {
    fn new(config: &TokenBucketConfig, first_refill: Instant) -> Self {
        Self {
            tokens: Mutex::new(Tokens {
                available: config.max_tokens,
                next_refill: first_refill,
            }),
            max_tokens: config.max_tokens,
            refill_amount: config.refill_amount,
            period: config.refill_interval(),
        }
    }

    /// Apply all refills due at `now`, capped at `max_tokens`.
    fn catch_up(&self, tokens: &mut Tokens, now: Instant) {
        if now < tokens.next_refill {
            return;
        }
        let overdue = now.duration_since(tokens.next_refill).as_nanos() / self.period.as_nanos();
        let due = u64::try_from(overdue).unwrap_or(u64::MAX).saturating_add(1);

        tokens.available = tokens
            .available
            .saturating_add(self.refill_amount.saturating_mul(due))
            .min(self.max_tokens);
        tokens.next_refill += self.period.saturating_mul(u32::try_from(due).unwrap_or(u32::MAX));
        trace!(tokens = tokens.available, due, "Token bucket refilled");
    }

    fn refill(&self, now: Instant) {
        let mut tokens = self.tokens.lock();
        self.catch_up(&mut tokens, now);
    }
}

/// Rate limiter holding up to `max_tokens` permits, topped up on a timer.
///
/// The refill task runs until [`TokenBucket::stop`] is called or the bucket
/// is dropped.
#[derive(Debug)]
pub struct TokenBucket {
    state: Arc<BucketState>,
    refill_interval: Duration,
    stop: CancellationToken,
}

impl TokenBucket {
    /// Create a full bucket and start its refill task on the current runtime.
    ///
    /// # Errors
    ///
    /// - `TokenBucketError::InvalidConfig` if `refill_interval` is zero
    /// - `TokenBucketError::NoRuntime` if called outside a Tokio runtime
    pub fn new(
        max_tokens: u64,
        refill_amount: u64,
        refill_interval: Duration,
    ) -> Result<Self, TokenBucketError> {
        Self::from_config(&TokenBucketConfig::new(max_tokens, refill_amount, refill_interval))
    }

    /// Create a bucket from configuration on the current runtime.
    ///
    /// # Errors
    ///
    /// See [`TokenBucket::new`].
    pub fn from_config(config: &TokenBucketConfig) -> Result<Self, TokenBucketError> {
        let spawner = TokioSpawner::try_current().ok_or(TokenBucketError::NoRuntime)?;
        Self::with_spawner(config, &spawner)
    }

    /// Create a bucket whose refill task runs on `spawner`'s runtime.
    ///
    /// # Errors
    ///
    /// Returns `TokenBucketError::InvalidConfig` if the refill interval is zero.
    pub fn with_spawner(
        config: &TokenBucketConfig,
        spawner: &TokioSpawner,
    ) -> Result<Self, TokenBucketError> {
        config.validate().map_err(TokenBucketError::InvalidConfig)?;

        let refill_interval = config.refill_interval();
        // Anchored here, not when the refill task is first polled.
        let first_refill = Instant::now() + refill_interval;
        let state = Arc::new(BucketState::new(config, first_refill));
        let stop = CancellationToken::new();

        drop(spawner.spawn(refill_loop(
            Arc::clone(&state),
            first_refill,
            refill_interval,
            stop.clone(),
        )));

        debug!(
            max_tokens = config.max_tokens,
            refill_amount = config.refill_amount,
            refill_interval_ms = config.refill_interval_ms,
            "Token bucket started"
        );

        Ok(Self {
            state,
            refill_interval,
            stop,
        })
    }

    /// Take one token if any are left. Never waits.
    ///
    /// Refills that have come due are applied first, unless the bucket has
    /// been stopped.
    #[must_use]
    pub fn take(&self) -> bool {
        let mut tokens = self.state.tokens.lock();
        if !self.stop.is_cancelled() {
            self.state.catch_up(&mut tokens, Instant::now());
        }
        if tokens.available > 0 {
            tokens.available -= 1;
            true
        } else {
            false
        }
    }

    /// Tokens currently available.
    #[must_use]
    pub fn available(&self) -> u64 {
        let mut tokens = self.state.tokens.lock();
        if !self.stop.is_cancelled() {
            self.state.catch_up(&mut tokens, Instant::now());
        }
        tokens.available
    }

    /// Capacity of the bucket.
    #[must_use]
    pub fn max_tokens(&self) -> u64 {
        self.state.max_tokens
    }

    /// Time between refills.
    #[must_use]
    pub const fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Halt refilling. Tokens already in the bucket can still be taken.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            self.stop.cancel();
            debug!("Token bucket stopped");
        }
    }

    /// Whether the refill task has been told to stop.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn refill_loop(
    state: Arc<BucketState>,
    first_refill: Instant,
    period: Duration,
    stop: CancellationToken,
) {
    let mut ticker = interval_at(first_refill, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticker.tick() => state.refill(Instant::now()),
        }
    }

    trace!("Token bucket refill loop exiting");
}
