//! Tests for configuration validation

use job_pool::config::{TokenBucketConfig, WorkerPoolConfig};
use std::time::Duration;

#[test]
fn test_pool_config_validation() {
    let valid = WorkerPoolConfig::new().with_worker_count(2).with_queue_capacity(10);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_worker_count() {
    let invalid = WorkerPoolConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_queue_capacities() {
    assert!(WorkerPoolConfig::new().with_job_queue_capacity(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_result_queue_capacity(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_error_queue_capacity(0).validate().is_err());
}

#[test]
fn test_pool_config_from_json() {
    let json = r#"{
        "name": "exports",
        "worker_count": 4,
        "job_queue_capacity": 32,
        "result_queue_capacity": 16,
        "error_queue_capacity": 8,
        "idle_check_interval_ms": 1000,
        "idle_min_uptime_ms": 5000
    }"#;

    let config = WorkerPoolConfig::from_json_str(json).expect("valid config");
    assert_eq!(config.name, "exports");
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.job_queue_capacity, 32);
    assert_eq!(config.idle_check_interval(), Some(Duration::from_secs(1)));
    assert_eq!(config.idle_min_uptime(), Duration::from_secs(5));
}

#[test]
fn test_pool_config_partial_json_uses_defaults() {
    let config = WorkerPoolConfig::from_json_str(r#"{"worker_count": 2}"#).unwrap();
    assert_eq!(config.worker_count, 2);
    assert_eq!(config.job_queue_capacity, WorkerPoolConfig::new().job_queue_capacity);
    assert!(config.idle_check_interval().is_none());
}

#[test]
fn test_pool_config_json_rejects_invalid() {
    assert!(WorkerPoolConfig::from_json_str(r#"{"worker_count": 0}"#).is_err());
    assert!(WorkerPoolConfig::from_json_str("not json").is_err());
}

#[test]
fn test_pool_config_roundtrips_through_serde() {
    let config = WorkerPoolConfig::new()
        .with_name("roundtrip")
        .with_idle_check_interval(Duration::from_millis(750));
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(WorkerPoolConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_token_bucket_config_from_json() {
    let json = r#"{"max_tokens": 5, "refill_amount": 5, "refill_interval_ms": 100}"#;
    let config = TokenBucketConfig::from_json_str(json).unwrap();
    assert_eq!(config, TokenBucketConfig::new(5, 5, Duration::from_millis(100)));
}
