//! External tool layer.
//!
//! This module wraps the three programs the pipeline shells out to:
//!
//! - **Probe**: resolve each executable once and report what is missing
//! - **Runner**: run one invocation to completion with captured output,
//!   an optional timeout and cooperative cancellation
//!
//! # Layout
//!
//! ```text
//! <bin-dir>/
//!     ├── rife-ncnn-vulkan/rife-ncnn-vulkan[.exe]
//!     └── realesrgan-ncnn-vulkan/realesrgan-ncnn-vulkan[.exe]
//! ffmpeg  (from PATH, or an explicit path in settings)
//! ```

pub(crate) mod probe;
mod runner;
mod types;

pub use probe::{probe_tools, ProbeReport};
pub use runner::{run_tool, RunLimits, ToolCommand, ToolOutput};
pub use types::{ToolError, ToolRef, ToolResult, ToolSet};
