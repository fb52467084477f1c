//! Logging configuration
//!
//! Initializes tracing for the binary. The library itself only emits events.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding a filter directive, e.g. `steplib=debug`.
pub const LOG_ENV: &str = "STEPLIB_LOG";

/// Filter from `STEPLIB_LOG`, then `RUST_LOG`, then `level`.
#[must_use]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initializes logging to stderr with the specified level.
///
/// Stdout stays reserved for command output. Calling this twice is harmless.
pub fn init_logging(level: &str) {
    let installed = fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
