//! Interpolate step - raises the frame rate with RIFE.
//!
//! RIFE is told how many frames to produce rather than a rate, so the
//! count is derived from the extracted count and the two rates.

use crate::models::{frame_pattern_name, PipelineStage, ToolKind};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::tools::ToolCommand;

use super::{input_frames, model_arg, record_frames, verify_frames};

/// Directory (under the working directory) receiving interpolated frames.
pub const INTERPOLATE_DIR: &str = "frames_interpolated";

/// Number of frames RIFE must write to play `source_count` frames
/// recorded at `source_fps` back at `target_fps`.
///
/// Rounds up, so a short clip never loses its last frame.
pub fn interpolated_frame_count(source_count: u32, source_fps: u32, target_fps: u32) -> u32 {
    if source_fps == 0 {
        return source_count;
    }
    let scaled = u64::from(source_count) * u64::from(target_fps);
    let count = scaled.div_ceil(u64::from(source_fps));
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Optional interpolation step.
pub struct InterpolateStep;

impl InterpolateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InterpolateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for InterpolateStep {
    fn name(&self) -> &str {
        "Interpolate"
    }

    fn description(&self) -> &str {
        "Interpolating frames"
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Interpolating
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn skip_reason(&self, ctx: &Context) -> Option<String> {
        let source = ctx.config.extract_fps();
        let target = ctx.config.target_fps();

        if ctx.config.skip_interpolation() {
            Some("disabled with --skip-interpolation".to_string())
        } else if target <= source {
            Some(format!(
                "target rate {} fps does not exceed source rate {} fps",
                target, source
            ))
        } else {
            None
        }
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        state.require_tools()?;
        if state.extract.is_none() {
            return Err(StepError::invalid_input("frames have not been extracted"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let rife = state.require_tools()?.rife.path.clone();
        let input = input_frames(state)?.clone();
        let out_dir = ctx.create_stage_dir(INTERPOLATE_DIR)?;

        let target_fps = ctx.config.target_fps();
        let target_count = interpolated_frame_count(input.frame_count, input.frame_rate, target_fps);
        let model = model_arg(&rife, &ctx.settings.pipeline.interpolation_model);

        ctx.logger.info(&format!(
            "Interpolating {} fps -> {} fps ({} -> {} frames)",
            input.frame_rate, target_fps, input.frame_count, target_count
        ));

        let cmd = ToolCommand::new(ToolKind::Rife, &rife)
            .arg("-i")
            .arg(&input.output_dir)
            .arg("-o")
            .arg(&out_dir)
            .arg("-m")
            .arg(model)
            .args(["-n", target_count.to_string().as_str()])
            .arg("-f")
            .arg(frame_pattern_name());

        let output = ctx.run_tool(&cmd, "interpolate")?;
        let result = record_frames(&out_dir, target_fps, &output)?;

        if result.frame_count < input.frame_count {
            return Err(StepError::invalid_output(format!(
                "RIFE wrote {} frames, fewer than the {} it was given",
                result.frame_count, input.frame_count
            )));
        }

        ctx.logger
            .finished("Interpolated", Some(result.frame_count), output.elapsed);
        state.interpolate = Some(result);

        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        verify_frames(state.interpolate.as_ref(), "Interpolation")
    }
}
