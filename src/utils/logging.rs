//! Structured logging setup for the binaries.
//!
//! Library code only emits `tracing` events; subscribers are installed by
//! the process entry points.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a fmt subscriber honoring `RUST_LOG` with a configured fallback
/// level. Safe to call once per process; later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log_targets)
        .try_init();
}
