//! Tests for tokio spawner utilities

use job_pool::runtime::tokio_spawner::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_pool_on_foreign_runtime() {
    use job_pool::config::WorkerPoolConfig;
    use job_pool::core::{job_fn, BoxedJob, WorkerPool};

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let spawner = TokioSpawner::new(runtime.handle().clone());

    let pool: WorkerPool<u8, u8> =
        WorkerPool::with_spawner(WorkerPoolConfig::new().with_worker_count(1), spawner).unwrap();
    pool.register_job("inc", |n: u8| -> BoxedJob<u8> {
        Box::new(job_fn(move |_ctx| async move { Ok::<_, anyhow::Error>(n + 1) }))
    });

    // Starting from a plain thread works because the spawner carries the runtime.
    pool.start().unwrap();
    let out = runtime.block_on(pool.submit(1, "inc")).unwrap();
    assert_eq!(out, 2);
    runtime.block_on(pool.stop());
}
