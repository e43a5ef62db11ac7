//! Worker pool, job contract and error taxonomy.

pub mod error;
pub mod job;
pub mod registry;
pub mod worker_pool;

pub use error::PoolError;
pub use job::{job_fn, BoxedJob, FnJob, Job, JobContext, JobFactory};
pub use registry::JobRegistry;
pub use worker_pool::{PoolStats, WorkerPool};
