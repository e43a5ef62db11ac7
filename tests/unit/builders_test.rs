//! Tests for builder modules

use job_pool::builders::pool_builder::PoolBuilder;
use job_pool::config::WorkerPoolConfig;
use job_pool::core::{job_fn, BoxedJob};

fn echo(input: String) -> BoxedJob<String> {
    Box::new(job_fn(move |_ctx| {
        let input = input.clone();
        async move { Ok::<_, anyhow::Error>(input) }
    }))
}

#[test]
fn test_pool_builder_keeps_config() {
    let builder: PoolBuilder<String, String> =
        PoolBuilder::new(WorkerPoolConfig::new().with_name("pool1").with_worker_count(3));
    assert_eq!(builder.config().name, "pool1");
    assert_eq!(builder.config().worker_count, 3);
}

#[tokio::test]
async fn test_pool_builder_builds_working_pool() {
    let pool = PoolBuilder::new(WorkerPoolConfig::new().with_worker_count(1))
        .job("echo", echo)
        .build()
        .expect("valid builder");

    assert!(pool.is_registered("echo"));
    let out = pool.submit("ping".to_string(), "echo").await.unwrap();
    assert_eq!(out, "ping");
    pool.stop().await;
}
