//! Tracing subscriber setup for binaries.
//!
//! The library only emits events; installing a subscriber is the binary's job.

use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor `--log-level` is given.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` (e.g. `"info"` or
/// `"sui_interface_fetcher=debug"`) is used. Calling this twice is harmless.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level.unwrap_or(DEFAULT_LOG_LEVEL))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
