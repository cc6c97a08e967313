//! Pipeline orchestrator for coordinating an enhancement run.
//!
//! This module provides the infrastructure for running the multi-step
//! enhancement pipeline. Each run consists of a sequence of steps that
//! validate, execute, and record their results, strictly one after the
//! other.
//!
//! # Architecture
//!
//! ```text
//! Enhancer (input check, work dir, logger, manifest, cleanup)
//!     └── Pipeline
//!         ├── Step: DependencyCheck
//!         ├── Step: Extract
//!         ├── Step: Interpolate   (optional)
//!         ├── Step: Upscale       (optional)
//!         └── Step: Encode
//! ```
//!
//! # Example
//!
//! ```ignore
//! use enhance_core::config::Settings;
//! use enhance_core::orchestrator::Enhancer;
//!
//! let settings = Settings::default();
//! let config = settings.pipeline_builder("clip.mp4").build()?;
//!
//! let summary = Enhancer::new(settings).run(config)?;
//! println!("Wrote {} at {} fps", summary.output_path.display(), summary.frame_rate);
//! ```

mod enhancer;
mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use enhancer::{Enhancer, RunSummary};
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{DependencyCheckStep, EncodeStep, ExtractStep, InterpolateStep, UpscaleStep};
pub use types::{Context, EncodeOutput, JobState, StageResult};

/// Create a standard pipeline with all steps in the correct order.
///
/// The standard pipeline executes these steps:
/// 1. DependencyCheck - probe RIFE, Real-ESRGAN and FFmpeg
/// 2. Extract - decode the input into PNG frames
/// 3. Interpolate - raise the frame rate with RIFE (optional)
/// 4. Upscale - enlarge frames with Real-ESRGAN (optional)
/// 5. Encode - assemble the frames into an H.264 video
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(DependencyCheckStep::new())
        .with_step(ExtractStep::new())
        .with_step(InterpolateStep::new())
        .with_step(UpscaleStep::new())
        .with_step(EncodeStep::new())
}
