//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Tool → Detail

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{FrameSequenceError, ToolKind};
use crate::tools::ToolError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input video does not exist (checked before anything else).
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The run was interrupted by the user.
    #[error("Run '{run_name}' was interrupted during '{step_name}'")]
    Cancelled { run_name: String, step_name: String },

    /// Failed to set up the run (create directories, open the log, etc.).
    #[error("Run '{run_name}' setup failed: {message}")]
    SetupFailed { run_name: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(run_name: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self::Cancelled {
            run_name: run_name.into(),
            step_name: step_name.into(),
        }
    }

    /// Whether the run ended because the user interrupted it.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }

    /// Remediation hint for precondition failures, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            PipelineError::InputNotFound(_) => {
                Some("Check the input path; it must point to an existing video file".to_string())
            }
            PipelineError::StepFailed {
                source: StepError::MissingDependencies { hints, .. },
                ..
            } => Some(hints.join("\n")),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// One or more external tools are missing.
    #[error("Missing dependencies: {missing}")]
    MissingDependencies { missing: String, hints: Vec<String> },

    /// An external command failed. `message` is the tool's diagnostic text.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// An external command exceeded the stage timeout.
    #[error("{tool} exceeded the {timeout_secs}s stage timeout and was killed")]
    TimedOut { tool: String, timeout_secs: u64 },

    /// The step was interrupted.
    #[error("Interrupted while running {0}")]
    Cancelled(String),

    /// The stage left an invalid frame sequence behind.
    #[error("Invalid frame sequence: {0}")]
    InvalidFrames(#[from] FrameSequenceError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    /// Create a cancelled error for the given tool.
    pub fn cancelled(tool: ToolKind) -> Self {
        Self::Cancelled(tool.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StepError::Cancelled(_))
    }
}

impl From<ToolError> for StepError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Missing(tools) => StepError::MissingDependencies {
                missing: tools
                    .iter()
                    .map(|t| format!("{} ({})", t.kind, t.path.display()))
                    .collect::<Vec<_>>()
                    .join(", "),
                hints: tools
                    .iter()
                    .map(|t| format!("{}: {}", t.kind, t.kind.remediation_hint()))
                    .collect(),
            },
            ToolError::SpawnFailed { tool, source } => {
                StepError::io_error(format!("starting {}", tool), source)
            }
            ToolError::CommandFailed {
                tool,
                exit_code,
                message,
            } => StepError::command_failed(tool.to_string(), exit_code, message),
            ToolError::TimedOut { tool, timeout_secs } => StepError::TimedOut {
                tool: tool.to_string(),
                timeout_secs,
            },
            ToolError::Cancelled { tool } => StepError::cancelled(tool),
            ToolError::Io { operation, source } => StepError::io_error(operation, source),
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
