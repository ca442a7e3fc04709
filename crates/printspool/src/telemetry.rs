//! Logging and tracing initialization.
//!
//! The crate logs through both facades: `log::` macros in the db and
//! storage layers, `tracing` spans around the ingest and sweep paths.
//! `init_logging` bridges the former into the latter and installs one
//! fmt subscriber. Safe to call more than once; later calls are no-ops.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, filtered by `RUST_LOG` (default
/// `info`).
pub fn init_logging() {
    // The bridge fails if a logger is already set; that just means a
    // previous call (or the host application) won.
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
