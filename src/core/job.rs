//! Job execution traits and the context handed to running jobs.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Execution context passed to every job by the worker that runs it.
///
/// The cancellation token is shared by all workers of one pool run and is
/// cancelled when the pool stops. Jobs that need a deadline derive it
/// themselves; the pool imposes none.
#[derive(Debug, Clone)]
pub struct JobContext {
    token: CancellationToken,
    worker_id: usize,
    submission_id: Uuid,
}

impl JobContext {
    pub(crate) const fn new(token: CancellationToken, worker_id: usize, submission_id: Uuid) -> Self {
        Self {
            token,
            worker_id,
            submission_id,
        }
    }

    /// Whether the pool has signalled cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the pool signals cancellation.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// The pool-wide cancellation token, for jobs that fan out their own tasks.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Index of the worker executing this job.
    #[must_use]
    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Identifier assigned to the submission that enqueued this job.
    #[must_use]
    pub const fn submission_id(&self) -> Uuid {
        self.submission_id
    }
}

/// A unit of work producing a `T` or failing with an error.
///
/// Concrete jobs are supplied by whoever registers them; the pool never looks
/// inside. A fresh instance is built by the job's factory for every submission.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use job_pool::core::{Job, JobContext};
///
/// struct Greet {
///     name: String,
/// }
///
/// #[async_trait]
/// impl Job<String> for Greet {
///     async fn execute(&self, _ctx: &JobContext) -> anyhow::Result<String> {
///         Ok(format!("hello, {}", self.name))
///     }
/// }
/// ```
#[async_trait]
pub trait Job<T>: Send + Sync + 'static {
    /// Run the job. Errors are returned verbatim to the submitter.
    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<T>;
}

/// Boxed job as stored on the job queue.
pub type BoxedJob<T> = Box<dyn Job<T>>;

/// Builds a new job from the caller's invocation context.
///
/// The context is moved in as-is; the pool never inspects it.
pub type JobFactory<C, T> = Arc<dyn Fn(C) -> BoxedJob<T> + Send + Sync>;

/// Job backed by an async closure. See [`job_fn`].
pub struct FnJob<F, T> {
    func: F,
    _result: PhantomData<fn() -> T>,
}

#[async_trait]
impl<F, Fut, T> Job<T> for FnJob<F, T>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    async fn execute(&self, ctx: &JobContext) -> anyhow::Result<T> {
        (self.func)(ctx.clone()).await
    }
}

/// Wrap an async closure as a [`Job`].
///
/// ```rust
/// use job_pool::core::{job_fn, BoxedJob};
///
/// let job: BoxedJob<u32> = Box::new(job_fn(|_ctx| async { Ok::<_, anyhow::Error>(7) }));
/// # let _ = job;
/// ```
pub const fn job_fn<F, Fut, T>(func: F) -> FnJob<F, T>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    FnJob {
        func,
        _result: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(u64);

    #[async_trait]
    impl Job<u64> for Double {
        async fn execute(&self, _ctx: &JobContext) -> anyhow::Result<u64> {
            Ok(self.0 * 2)
        }
    }

    fn ctx() -> JobContext {
        JobContext::new(CancellationToken::new(), 3, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_trait_object_execute() {
        let job: BoxedJob<u64> = Box::new(Double(21));
        assert_eq!(job.execute(&ctx()).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_job_fn_sees_context() {
        let job = job_fn(|ctx: JobContext| async move { Ok::<_, anyhow::Error>(ctx.worker_id()) });
        assert_eq!(job.execute(&ctx()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_context_cancellation() {
        let token = CancellationToken::new();
        let ctx = JobContext::new(token.clone(), 0, Uuid::new_v4());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }
}
