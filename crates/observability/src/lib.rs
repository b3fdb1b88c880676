//! Shared tracing/logging setup for the billing services and their tests.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialize process-wide tracing.
///
/// Emits JSON lines with timestamps, filtered via `RUST_LOG` (default
/// `info`). Safe to call multiple times; subsequent calls are no-ops, so
/// every binary and test entry point can call it unconditionally.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
