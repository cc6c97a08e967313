//! Pipeline step implementations.
//!
//! Each step handles a specific phase of the enhancement pipeline.
//! Every frame-producing step writes into its own directory under the
//! run's working directory, and the sequence is inspected before the
//! next step may consume it.

mod dependency_check;
mod encode;
mod extract;
mod interpolate;
mod upscale;

pub use dependency_check::DependencyCheckStep;
pub use encode::EncodeStep;
pub use extract::ExtractStep;
pub use interpolate::{interpolated_frame_count, InterpolateStep};
pub use upscale::UpscaleStep;

use std::path::{Path, PathBuf};

use crate::models::inspect_frames;
use crate::tools::ToolOutput;

use super::errors::{StepError, StepResult};
use super::types::{JobState, StageResult};

/// Inspect a stage's output directory and describe it.
fn record_frames(dir: &Path, frame_rate: u32, output: &ToolOutput) -> StepResult<StageResult> {
    let sequence = inspect_frames(dir)?;
    Ok(StageResult {
        output_dir: sequence.dir,
        frame_count: sequence.count,
        frame_rate,
        exit_code: output.exit_code,
        elapsed_secs: output.elapsed.as_secs_f64(),
    })
}

/// Check that a recorded stage result still matches what is on disk.
fn verify_frames(result: Option<&StageResult>, stage: &str) -> StepResult<()> {
    let result = result
        .ok_or_else(|| StepError::invalid_output(format!("{} results not recorded", stage)))?;

    let on_disk = inspect_frames(&result.output_dir)?;
    if on_disk.count != result.frame_count {
        return Err(StepError::invalid_output(format!(
            "{} recorded {} frames but {} are on disk",
            stage, result.frame_count, on_disk.count
        )));
    }
    Ok(())
}

/// Frames the next stage should consume.
fn input_frames(state: &JobState) -> StepResult<&StageResult> {
    state
        .latest_frames()
        .ok_or_else(|| StepError::invalid_input("no frames have been extracted"))
}

/// Model argument for an ncnn tool.
///
/// A relative model name that exists next to the executable is passed
/// as that path, since the ncnn builds resolve `-m` against the working
/// directory. Anything else is passed through unchanged.
fn model_arg(tool_path: &Path, model: &str) -> PathBuf {
    let model_path = Path::new(model);
    if model_path.is_relative() {
        if let Some(dir) = tool_path.parent() {
            let bundled = dir.join(model_path);
            if bundled.exists() {
                return bundled;
            }
        }
    }
    model_path.to_path_buf()
}
