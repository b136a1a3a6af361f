//! Logging setup
//!
//! Structured logging via `tracing`, filtered through `RUST_LOG`.

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; only the first call installs the subscriber,
/// so tests can call this freely.
///
/// # Example
///
/// ```rust,no_run
/// cogni_core::telemetry::init_telemetry();
/// ```
pub fn init_telemetry() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_line_number(true),
            )
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}
