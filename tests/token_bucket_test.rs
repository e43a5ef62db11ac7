//! Integration tests for TokenBucket
//!
//! Real timers are used throughout; intervals are chosen with enough slack to
//! stay stable on loaded CI machines.

use job_pool::config::TokenBucketConfig;
use job_pool::runtime::TokioSpawner;
use job_pool::TokenBucket;
use std::time::Duration;

#[tokio::test]
async fn test_five_takes_then_refill() {
    let bucket = TokenBucket::new(5, 5, Duration::from_millis(100)).expect("valid bucket");

    for i in 0..5 {
        assert!(bucket.take(), "take {i} should succeed");
    }
    assert!(!bucket.take(), "sixth take should be denied");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bucket.take(), "bucket should have refilled after one interval");

    bucket.stop();
}

#[tokio::test]
async fn test_refill_after_exactly_one_interval_repeatedly() {
    for round in 0..10 {
        let bucket = TokenBucket::new(5, 5, Duration::from_millis(20)).unwrap();
        for _ in 0..5 {
            assert!(bucket.take());
        }
        assert!(!bucket.take());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bucket.take(), "round {round}: refill should be due");
        bucket.stop();
    }
}

#[tokio::test]
async fn test_zero_refill_amount_never_refills() {
    let bucket = TokenBucket::new(1, 0, Duration::from_millis(10)).unwrap();
    assert!(bucket.take());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!bucket.take());
    bucket.stop();
}

#[tokio::test]
async fn test_refill_never_exceeds_capacity() {
    let bucket = TokenBucket::new(3, 10, Duration::from_millis(20)).unwrap();
    assert!(bucket.take());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bucket.available(), 3);
    assert_eq!(bucket.max_tokens(), 3);

    bucket.stop();
}

#[tokio::test]
async fn test_partial_refill() {
    let bucket = TokenBucket::new(4, 1, Duration::from_millis(200)).unwrap();
    for _ in 0..4 {
        assert!(bucket.take());
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(bucket.available(), 1);

    bucket.stop();
}

#[tokio::test]
async fn test_stop_halts_refill() {
    let bucket = TokenBucket::new(2, 2, Duration::from_millis(200)).unwrap();
    assert!(bucket.take());
    assert!(bucket.take());
    bucket.stop();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!bucket.take());
    assert!(bucket.is_stopped());
}

#[test]
fn test_bucket_on_explicit_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let spawner = TokioSpawner::new(runtime.handle().clone());

    let config = TokenBucketConfig::new(1, 1, Duration::from_millis(50));
    let bucket = TokenBucket::with_spawner(&config, &spawner).unwrap();
    assert!(bucket.take());
    assert!(!bucket.take());

    std::thread::sleep(Duration::from_millis(150));
    assert!(bucket.take());
    drop(bucket);
}

#[tokio::test]
async fn test_gating_pool_submissions() {
    use job_pool::config::WorkerPoolConfig;
    use job_pool::core::{job_fn, BoxedJob, WorkerPool};

    let bucket = TokenBucket::new(2, 1, Duration::from_secs(60)).unwrap();
    let pool: WorkerPool<u32, u32> =
        WorkerPool::new(WorkerPoolConfig::new().with_worker_count(1)).unwrap();
    pool.register_job("square", |n: u32| -> BoxedJob<u32> {
        Box::new(job_fn(move |_ctx| async move { Ok::<_, anyhow::Error>(n * n) }))
    });

    let mut accepted = Vec::new();
    for n in 1..=4 {
        if bucket.take() {
            accepted.push(pool.submit(n, "square").await.unwrap());
        }
    }
    assert_eq!(accepted, vec![1, 4]);

    bucket.stop();
    pool.stop().await;
}
