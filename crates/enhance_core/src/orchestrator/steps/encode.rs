//! Encode step - assembles the final frames into an H.264 video.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{frame_pattern, PipelineStage, ToolKind};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, EncodeOutput, JobState};
use crate::tools::ToolCommand;

use super::input_frames;

/// Encode step: libx264, `-preset slow`, yuv420p, at the run's output rate.
pub struct EncodeStep;

impl EncodeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EncodeStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Hidden sibling of `output` that FFmpeg writes to. It only replaces
/// `output` once the encode has succeeded, so a failed run never touches
/// a file that was already there. The extension stays last because FFmpeg
/// picks the container from it.
fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!(".{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.partial", stem),
    };
    output.with_file_name(name)
}

/// Remove the partial file a failed encode left at `path`.
fn discard_partial(ctx: &Context, path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => ctx
            .logger
            .warn(&format!("Removed partial output {}", path.display())),
        Err(e) => ctx.logger.warn(&format!(
            "Could not remove partial output {}: {}",
            path.display(),
            e
        )),
    }
}

impl PipelineStep for EncodeStep {
    fn name(&self) -> &str {
        "Encode"
    }

    fn description(&self) -> &str {
        "Encoding video"
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Encoding
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        state.require_tools()?;
        input_frames(state).map(|_| ())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let ffmpeg = state.require_tools()?.ffmpeg.path.clone();
        let input = input_frames(state)?.clone();
        let frame_rate = state
            .output_frame_rate()
            .ok_or_else(|| StepError::invalid_input("output frame rate is unknown"))?;
        let crf = ctx.config.crf();
        let output_path = ctx.config.output().to_path_buf();
        let partial = partial_path(&output_path);

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StepError::io_error(format!("create {}", parent.display()), e)
                })?;
            }
        }

        ctx.logger.info(&format!(
            "Encoding {} frames at {} fps (crf {}) to {}",
            input.frame_count,
            frame_rate,
            crf,
            output_path.display()
        ));
        if output_path.exists() {
            ctx.logger.warn(&format!(
                "{} exists and will be replaced if the encode succeeds",
                output_path.display()
            ));
        }

        let cmd = ToolCommand::new(ToolKind::Ffmpeg, ffmpeg)
            .args(["-hide_banner", "-framerate", frame_rate.to_string().as_str(), "-i"])
            .arg(frame_pattern(&input.output_dir))
            .args(["-c:v", "libx264", "-preset", "slow"])
            .args(["-crf", crf.to_string().as_str()])
            .args(["-pix_fmt", "yuv420p", "-y"])
            .arg(&partial);

        let output = match ctx.run_tool(&cmd, "encode") {
            Ok(output) => output,
            Err(e) => {
                discard_partial(ctx, &partial);
                return Err(e);
            }
        };

        let file_size_bytes = fs::metadata(&partial)
            .map(|m| m.len())
            .map_err(|e| {
                StepError::invalid_output(format!(
                    "FFmpeg exited 0 but {} is missing: {}",
                    partial.display(),
                    e
                ))
            })?;
        if file_size_bytes == 0 {
            discard_partial(ctx, &partial);
            return Err(StepError::invalid_output(format!(
                "FFmpeg exited 0 but {} is empty",
                partial.display()
            )));
        }

        if let Err(e) = fs::rename(&partial, &output_path) {
            discard_partial(ctx, &partial);
            return Err(StepError::io_error(
                format!("move {} to {}", partial.display(), output_path.display()),
                e,
            ));
        }

        let encoded = EncodeOutput {
            output_path,
            file_size_bytes,
            frame_rate,
            crf,
            exit_code: output.exit_code,
        };
        ctx.logger.success(&format!(
            "Video encoded successfully ({:.2} MB)",
            encoded.file_size_mb()
        ));
        state.encode = Some(encoded);

        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let encoded = state
            .encode
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("encode results not recorded"))?;

        if !encoded.output_path.is_file() {
            return Err(StepError::invalid_output(format!(
                "output file {} does not exist",
                encoded.output_path.display()
            )));
        }
        Ok(())
    }
}
