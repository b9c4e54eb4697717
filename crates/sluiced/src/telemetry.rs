//! Telemetry initialization for the Sluice daemon.
//!
//! Console-only `tracing` output: an `EnvFilter` gates the level, taking
//! `RUST_LOG` from the environment when set and falling back to the
//! configured level otherwise.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Call this once at startup, before any `tracing` events are emitted.
pub fn init_console(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
