//! Tests for error types

use job_pool::core::PoolError;

#[test]
fn test_job_not_found_error() {
    let err = PoolError::JobNotFound {
        name: "nightly-export".to_string(),
    };
    assert_eq!(format!("{}", err), "job not found: nightly-export");
}

#[test]
fn test_queue_closed_error() {
    assert_eq!(format!("{}", PoolError::QueueClosed), "job queue is closed");
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_execution_error_keeps_source() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "backup file missing");
    let err = PoolError::from(anyhow::Error::new(io));
    assert_eq!(format!("{}", err), "backup file missing");

    let inner = err.execution_error().expect("execution error");
    let io = inner.downcast_ref::<std::io::Error>().expect("io error");
    assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
}
