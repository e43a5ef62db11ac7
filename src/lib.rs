//! # Job Pool
//!
//! A lazily started, async worker pool for named jobs, plus a standalone
//! token-bucket rate limiter.
//!
//! Callers register job factories by name ahead of time. At request time they
//! submit a name together with an opaque invocation context; the pool builds
//! the job from the context, runs it on one of a fixed set of Tokio worker
//! tasks, and hands back an outcome.
//!
//! ## Key Features
//!
//! - **Named Job Factories**: any type implementing [`core::Job`] can be registered
//! - **Opaque Invocation Context**: the pool threads a caller-chosen `C` through to factories untouched
//! - **Lazy Start, Opt-in Idle Stop**: workers spawn on first use and may stop when nothing is in flight
//! - **Bounded Queues**: job, result and error queues all apply backpressure
//! - **Token Bucket**: a capped, timer-refilled permit counter for admission control
//!
//! ## WorkerPool
//!
//! ```rust,ignore
//! use job_pool::config::WorkerPoolConfig;
//! use job_pool::core::{BoxedJob, WorkerPool};
//!
//! let pool: WorkerPool<Request, Report> = WorkerPool::new(
//!     WorkerPoolConfig::new()
//!         .with_worker_count(4)
//!         .with_queue_capacity(128),
//! )?;
//!
//! pool.register_job("export", |req: Request| -> BoxedJob<Report> {
//!     Box::new(ExportJob::from_request(req))
//! });
//!
//! // Starts the pool if needed, then waits for an outcome.
//! let report = pool.submit(request, "export").await?;
//!
//! pool.stop().await;
//! ```
//!
//! Outcomes travel back over queues shared by all submissions, so concurrent
//! callers are not guaranteed to receive the outcome of their own job. See
//! [`core::worker_pool`] for details.
//!
//! ## TokenBucket
//!
//! ```rust,ignore
//! use job_pool::TokenBucket;
//! use std::time::Duration;
//!
//! let bucket = TokenBucket::new(5, 5, Duration::from_millis(100))?;
//! if !bucket.take() {
//!     return Err(TooManyRequests);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Worker pool, job contract and error types.
pub mod core;
/// Configuration models for pools and rate limiters.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Runtime adapters used to spawn background tasks.
pub mod runtime;
/// Token bucket rate limiter.
pub mod token_bucket;
/// Shared utilities.
pub mod util;

pub use crate::core::{Job, JobContext, PoolError, WorkerPool};
pub use crate::token_bucket::TokenBucket;
