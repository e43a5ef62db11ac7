//! Telemetry helpers for structured logging.

/// Install a default `tracing` subscriber driven by `RUST_LOG`.
///
/// Does nothing if the application already installed its own subscriber.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
