//! Log subscriber setup for the `cpk-report` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the caller.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maps a `-v` count to the crate's default log level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs a stderr fmt subscriber.
///
/// `RUST_LOG` directives take precedence; otherwise this crate logs at the
/// level chosen by `verbosity`. Calling it twice is harmless: the second
/// install is ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
