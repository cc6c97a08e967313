//! Data models for the video enhancer.
//!
//! This module contains the core data structures shared by the
//! orchestrator and the tool layer:
//! - Enums for pipeline stages and external tool kinds
//! - The immutable `PipelineConfig` and its builder
//! - Frame sequence inspection and validation

mod enums;
mod frames;
mod jobs;

pub use enums::{PipelineStage, ToolKind};
pub use frames::{
    frame_file_name, frame_pattern, frame_pattern_name, inspect_frames, FrameSequence, FrameSequenceError,
    FRAME_EXTENSION,
};
pub use jobs::{
    default_output_path, ConfigValidationError, PipelineConfig, PipelineConfigBuilder,
    DEFAULT_CRF, DEFAULT_EXTRACT_FPS, DEFAULT_SCALE, DEFAULT_TARGET_FPS,
};
