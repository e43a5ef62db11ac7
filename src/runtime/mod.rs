//! Runtime adapters used to launch pool and rate-limiter tasks.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
