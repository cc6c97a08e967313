//! Upscale step - enlarges every frame with Real-ESRGAN.
//!
//! Real-ESRGAN exits 0 in some failure modes (e.g. a model file that
//! does not match `-s`), so the first output frame's size is compared
//! against the first input frame times the scale factor. Only the image
//! headers are read.

use std::path::Path;

use crate::models::{PipelineStage, ToolKind};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::tools::ToolCommand;

use super::{input_frames, model_arg, record_frames, verify_frames};

/// Directory (under the working directory) receiving upscaled frames.
pub const UPSCALE_DIR: &str = "frames_upscaled";

/// Optional upscale step.
pub struct UpscaleStep;

impl UpscaleStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UpscaleStep {
    fn default() -> Self {
        Self::new()
    }
}

fn dimensions(path: &Path) -> StepResult<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| {
        StepError::invalid_output(format!("cannot read frame {}: {}", path.display(), e))
    })
}

impl PipelineStep for UpscaleStep {
    fn name(&self) -> &str {
        "Upscale"
    }

    fn description(&self) -> &str {
        "Upscaling frames"
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Upscaling
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn skip_reason(&self, ctx: &Context) -> Option<String> {
        ctx.config
            .skip_upscale()
            .then(|| "disabled with --skip-upscale".to_string())
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        state.require_tools()?;
        input_frames(state).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let realesrgan = state.require_tools()?.realesrgan.path.clone();
        let input = input_frames(state)?.clone();
        let out_dir = ctx.create_stage_dir(UPSCALE_DIR)?;

        let scale = ctx.config.scale();
        let pipeline = &ctx.settings.pipeline;
        let model = model_arg(&realesrgan, &pipeline.upscale_model);

        ctx.logger.info(&format!(
            "Upscaling {} frames x{} with {}",
            input.frame_count, scale, pipeline.upscale_model
        ));

        let cmd = ToolCommand::new(ToolKind::RealEsrgan, &realesrgan)
            .arg("-i")
            .arg(&input.output_dir)
            .arg("-o")
            .arg(&out_dir)
            .args(["-s", scale.to_string().as_str()])
            .arg("-m")
            .arg(model)
            .args(["-n", pipeline.upscale_threads.as_str()]);

        let output = ctx.run_tool(&cmd, "upscale")?;
        let result = record_frames(&out_dir, input.frame_rate, &output)?;

        if result.frame_count != input.frame_count {
            return Err(StepError::invalid_output(format!(
                "Real-ESRGAN wrote {} frames for {} inputs",
                result.frame_count, input.frame_count
            )));
        }

        ctx.logger
            .finished("Upscaled", Some(result.frame_count), output.elapsed);
        state.upscale = Some(result);

        Ok(())
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        verify_frames(state.upscale.as_ref(), "Upscale")?;

        let (Some(before), Some(after)) = (
            state.interpolate.as_ref().or(state.extract.as_ref()),
            state.upscale.as_ref(),
        ) else {
            return Err(StepError::invalid_output("upscale input not recorded"));
        };

        let scale = ctx.config.scale();
        let (in_w, in_h) = dimensions(&before.sequence().first_frame())?;
        let (out_w, out_h) = dimensions(&after.sequence().first_frame())?;
        let expected = (in_w * scale, in_h * scale);

        ctx.logger.validation(&format!(
            "Frame size {}x{} -> {}x{}",
            in_w, in_h, out_w, out_h
        ));

        if (out_w, out_h) != expected {
            return Err(StepError::invalid_output(format!(
                "upscaled frames are {}x{}, expected {}x{} ({}x{} at x{})",
                out_w, out_h, expected.0, expected.1, in_w, in_h, scale
            )));
        }

        // A tool that dies mid-run can leave a short or truncated last frame.
        let last = after.sequence().last_frame();
        let (last_w, last_h) = dimensions(&last)?;
        if (last_w, last_h) != expected {
            return Err(StepError::invalid_output(format!(
                "last upscaled frame {} is {}x{}, expected {}x{}",
                last.display(),
                last_w,
                last_h,
                expected.0,
                expected.1
            )));
        }
        Ok(())
    }
}
