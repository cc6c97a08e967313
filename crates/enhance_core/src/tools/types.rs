//! Types shared by the probe and the runner.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ToolKind;

/// Errors from locating or running an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// One or more required executables were not found.
    #[error("Missing dependencies: {}", format_missing(.0))]
    Missing(Vec<ToolRef>),

    /// The process could not be started.
    #[error("Failed to run {tool}: {source}")]
    SpawnFailed {
        tool: ToolKind,
        #[source]
        source: io::Error,
    },

    /// The process exited with a non-zero status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: ToolKind,
        exit_code: i32,
        message: String,
    },

    /// The process ran longer than the configured limit and was killed.
    #[error("{tool} did not finish within {timeout_secs}s and was killed")]
    TimedOut { tool: ToolKind, timeout_secs: u64 },

    /// The run was cancelled while the process was active.
    #[error("{tool} was interrupted")]
    Cancelled { tool: ToolKind },

    /// Capture file handling failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

fn format_missing(missing: &[ToolRef]) -> String {
    missing
        .iter()
        .map(|t| format!("{} ({})", t.kind, t.path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// A resolved reference to one external executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    /// Which tool this is.
    pub kind: ToolKind,
    /// Resolved (or expected) executable path.
    pub path: PathBuf,
    /// Whether the executable was found.
    pub exists: bool,
}

impl ToolRef {
    /// One-line status used in the dependency report.
    pub fn status_line(&self) -> String {
        if self.exists {
            format!("[OK] {}: {}", self.kind, self.path.display())
        } else {
            format!("[MISSING] {}: {}", self.kind, self.path.display())
        }
    }
}

/// The three tools the pipeline needs, all verified present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet {
    pub rife: ToolRef,
    pub realesrgan: ToolRef,
    pub ffmpeg: ToolRef,
}

impl ToolSet {
    /// Reference for a given tool kind.
    pub fn get(&self, kind: ToolKind) -> &ToolRef {
        match kind {
            ToolKind::Rife => &self.rife,
            ToolKind::RealEsrgan => &self.realesrgan,
            ToolKind::Ffmpeg => &self.ffmpeg,
        }
    }
}
