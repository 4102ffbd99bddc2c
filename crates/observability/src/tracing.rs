//! Tracing/logging initialization.
//!
//! JSON structured logs, filter configurable via `RUST_LOG`. The breeding
//! services emit `warn` events for best-effort compensation failures, so a
//! deployment should keep at least the `warn` level enabled.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
