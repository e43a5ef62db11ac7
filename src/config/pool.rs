//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::env::{load_dotenv, parse_var};

/// Default capacity of each of the three pool queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Worker pool configuration.
///
/// All fields have defaults, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Name used in log events.
    pub name: String,
    /// Number of worker tasks. Must be at least 1.
    pub worker_count: usize,
    /// Capacity of the job queue; `submit` waits while it is full.
    pub job_queue_capacity: usize,
    /// Capacity of the shared results queue.
    pub result_queue_capacity: usize,
    /// Capacity of the shared errors queue.
    pub error_queue_capacity: usize,
    /// How often the idle monitor checks for in-flight jobs, in milliseconds.
    /// `None` disables idle-triggered shutdown.
    pub idle_check_interval_ms: Option<u64>,
    /// Minimum time the pool must have been running before the idle monitor
    /// may stop it, in milliseconds.
    pub idle_min_uptime_ms: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "job-pool".to_string(),
            worker_count: num_cpus::get().max(1),
            job_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            error_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_check_interval_ms: None,
            idle_min_uptime_ms: 0,
        }
    }
}

impl WorkerPoolConfig {
    /// Configuration with one worker per CPU and default queue capacities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the number of worker tasks.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the job queue capacity.
    #[must_use]
    pub fn with_job_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = capacity;
        self
    }

    /// Set the results queue capacity.
    #[must_use]
    pub fn with_result_queue_capacity(mut self, capacity: usize) -> Self {
        self.result_queue_capacity = capacity;
        self
    }

    /// Set the errors queue capacity.
    #[must_use]
    pub fn with_error_queue_capacity(mut self, capacity: usize) -> Self {
        self.error_queue_capacity = capacity;
        self
    }

    /// Set all three queue capacities at once.
    #[must_use]
    pub fn with_queue_capacity(self, capacity: usize) -> Self {
        self.with_job_queue_capacity(capacity)
            .with_result_queue_capacity(capacity)
            .with_error_queue_capacity(capacity)
    }

    /// Enable idle-triggered shutdown, checking every `interval`.
    #[must_use]
    pub fn with_idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval_ms = Some(duration_to_ms(interval));
        self
    }

    /// Require the pool to run at least `uptime` before it may stop for idleness.
    #[must_use]
    pub fn with_idle_min_uptime(mut self, uptime: Duration) -> Self {
        self.idle_min_uptime_ms = duration_to_ms(uptime);
        self
    }

    /// Idle check interval, if idle-triggered shutdown is enabled.
    #[must_use]
    pub fn idle_check_interval(&self) -> Option<Duration> {
        self.idle_check_interval_ms.map(Duration::from_millis)
    }

    /// Minimum uptime before idle shutdown is allowed.
    #[must_use]
    pub const fn idle_min_uptime(&self) -> Duration {
        Duration::from_millis(self.idle_min_uptime_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.job_queue_capacity == 0 {
            return Err("job_queue_capacity must be greater than 0".into());
        }
        if self.result_queue_capacity == 0 {
            return Err("result_queue_capacity must be greater than 0".into());
        }
        if self.error_queue_capacity == 0 {
            return Err("error_queue_capacity must be greater than 0".into());
        }
        if self.idle_check_interval_ms == Some(0) {
            return Err("idle_check_interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `JOB_POOL_*` environment variables, loading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `JOB_POOL_NAME` | `name` |
    /// | `JOB_POOL_WORKERS` | `worker_count` |
    /// | `JOB_POOL_JOB_QUEUE` | `job_queue_capacity` |
    /// | `JOB_POOL_RESULT_QUEUE` | `result_queue_capacity` |
    /// | `JOB_POOL_ERROR_QUEUE` | `error_queue_capacity` |
    /// | `JOB_POOL_IDLE_CHECK_MS` | `idle_check_interval_ms` |
    /// | `JOB_POOL_IDLE_MIN_UPTIME_MS` | `idle_min_uptime_ms` |
    ///
    /// # Errors
    ///
    /// Returns an error if a variable does not parse or a value is invalid.
    pub fn from_env() -> Result<Self, String> {
        load_dotenv();
        let mut cfg = Self::default();

        if let Some(name) = parse_var::<String>("JOB_POOL_NAME")? {
            cfg.name = name;
        }
        if let Some(workers) = parse_var("JOB_POOL_WORKERS")? {
            cfg.worker_count = workers;
        }
        if let Some(capacity) = parse_var("JOB_POOL_JOB_QUEUE")? {
            cfg.job_queue_capacity = capacity;
        }
        if let Some(capacity) = parse_var("JOB_POOL_RESULT_QUEUE")? {
            cfg.result_queue_capacity = capacity;
        }
        if let Some(capacity) = parse_var("JOB_POOL_ERROR_QUEUE")? {
            cfg.error_queue_capacity = capacity;
        }
        if let Some(interval) = parse_var("JOB_POOL_IDLE_CHECK_MS")? {
            cfg.idle_check_interval_ms = Some(interval);
        }
        if let Some(uptime) = parse_var("JOB_POOL_IDLE_MIN_UPTIME_MS")? {
            cfg.idle_min_uptime_ms = uptime;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
