//! Logging types and configuration.

use serde::{Deserialize, Serialize};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How much of a run reaches its log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level written.
    pub level: LogLevel,
    /// Keep raw tool output out of the log; it is only replayed from the
    /// tail when a stage fails.
    pub compact: bool,
    /// Tool output lines kept for the failure report. Zero disables it.
    pub error_tail: usize,
    /// Prefix each line with the wall-clock time.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Verbose configuration: debug level, every tool line echoed.
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            compact: false,
            error_tail: 50,
            show_timestamps: true,
        }
    }
}

/// Callback receiving every formatted log line (the console, in the CLI).
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;
