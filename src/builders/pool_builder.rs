//! Builder assembling a pool and its job registrations from configuration.

use std::sync::Arc;

use crate::config::WorkerPoolConfig;
use crate::core::{BoxedJob, JobFactory, PoolError, WorkerPool};
use crate::runtime::TokioSpawner;

/// Collects configuration, a spawner and named job factories, then builds a
/// dormant [`WorkerPool`] with every job registered.
///
/// ```rust,ignore
/// let pool = PoolBuilder::new(WorkerPoolConfig::from_env()?)
///     .job("export", |req: Request| -> BoxedJob<Report> { Box::new(ExportJob::new(req)) })
///     .job("backup", |req: Request| -> BoxedJob<Report> { Box::new(BackupJob::new(req)) })
///     .build()?;
/// ```
pub struct PoolBuilder<C, T> {
    config: WorkerPoolConfig,
    spawner: Option<TokioSpawner>,
    jobs: Vec<(String, JobFactory<C, T>)>,
}

impl<C, T> PoolBuilder<C, T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    /// Start from the given configuration.
    #[must_use]
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            spawner: None,
            jobs: Vec::new(),
        }
    }

    /// Run the pool's tasks on `spawner` instead of the runtime current at start.
    #[must_use]
    pub fn spawner(mut self, spawner: TokioSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Register a job factory under `name`. Later registrations of the same
    /// name win.
    #[must_use]
    pub fn job<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(C) -> BoxedJob<T> + Send + Sync + 'static,
    {
        self.jobs.push((name.into(), Arc::new(factory)));
        self
    }

    /// Pool configuration collected so far.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Names queued for registration, in insertion order.
    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|(name, _)| name.as_str())
    }

    /// Validate the configuration and build the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn build(self) -> Result<WorkerPool<C, T>, PoolError> {
        let pool = match self.spawner {
            Some(spawner) => WorkerPool::with_spawner(self.config, spawner)?,
            None => WorkerPool::new(self.config)?,
        };
        for (name, factory) in self.jobs {
            pool.register_factory(name, factory);
        }
        Ok(pool)
    }
}
