//! Configuration models for pools and rate limiters.

mod env;
pub mod pool;
pub mod rate_limit;

pub use pool::WorkerPoolConfig;
pub use rate_limit::TokenBucketConfig;
