//! Run logging and process-wide tracing.
//!
//! Each run writes its own log through [`RunLogger`]. Library diagnostics
//! go through `tracing`, installed once by [`init_tracing`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use enhance_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("clip_enhance", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("[2/5] Extracting frames");
//! logger.command("ffmpeg -i clip.mp4 -r 30 ...");
//! logger.finished("Extract", Some(312), Duration::from_secs(4));
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` and falls back to `default_level`. Output goes to
/// stderr so it never mixes with the run log on stdout.
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_filter_directives() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert!(EnvFilter::try_new(LogLevel::Trace.as_filter()).is_ok());
    }
}
