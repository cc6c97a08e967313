//! Extract step - decodes the input video into numbered PNG frames.

use crate::models::{frame_pattern, PipelineStage, ToolKind};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::tools::ToolCommand;

use super::{record_frames, verify_frames};

/// Directory (under the working directory) receiving extracted frames.
pub const EXTRACT_DIR: &str = "frames_extracted";

/// Extract step: `ffmpeg -i <input> -r <fps> -q:v 2 <dir>/%06d.png`.
pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "Extract"
    }

    fn description(&self) -> &str {
        "Extracting frames"
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Extracting
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        state.require_tools()?;
        if !ctx.config.input().is_file() {
            return Err(StepError::invalid_input(format!(
                "input file not found: {}",
                ctx.config.input().display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let ffmpeg = state.require_tools()?.ffmpeg.path.clone();
        let out_dir = ctx.create_stage_dir(EXTRACT_DIR)?;
        let fps = ctx.config.extract_fps();

        ctx.logger.info(&format!(
            "Extracting {} at {} fps",
            ctx.config.input().display(),
            fps
        ));

        let cmd = ToolCommand::new(ToolKind::Ffmpeg, ffmpeg)
            .args(["-hide_banner", "-i"])
            .arg(ctx.config.input())
            .args(["-r", fps.to_string().as_str(), "-q:v", "2"])
            .arg(frame_pattern(&out_dir));

        let output = ctx.run_tool(&cmd, "extract")?;
        let result = record_frames(&out_dir, fps, &output)?;

        ctx.logger
            .finished("Extracted", Some(result.frame_count), output.elapsed);
        state.extract = Some(result);

        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        verify_frames(state.extract.as_ref(), "Extraction")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::orchestrator::steps::DependencyCheckStep;
    use crate::test_support::FakeTools;

    #[test]
    fn extracts_frames_at_requested_rate() {
        let tools = FakeTools::install();
        let ctx = tools.context(tools.config_builder().extract_fps(50).build().unwrap());
        let mut state = JobState::new("run-1");
        DependencyCheckStep::new().execute(&ctx, &mut state).unwrap();

        let step = ExtractStep::new();
        step.validate_input(&ctx, &state).unwrap();
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let extract = state.extract.unwrap();
        assert_eq!(extract.frame_count, 5);
        assert_eq!(extract.frame_rate, 50);
        assert!(extract.output_dir.ends_with(EXTRACT_DIR));
    }

    #[test]
    fn frame_count_reaches_the_run_log() {
        let tools = FakeTools::install();
        let ctx = tools.context(tools.config_builder().extract_fps(30).build().unwrap());
        let mut state = JobState::new("run-1");
        DependencyCheckStep::new().execute(&ctx, &mut state).unwrap();

        ExtractStep::new().execute(&ctx, &mut state).unwrap();
        ctx.logger.flush();

        let log = std::fs::read_to_string(ctx.logger.log_path()).unwrap();
        assert!(log.contains("[SUCCESS] Extracted: 3 frames in"));
    }

    #[test]
    fn requires_dependency_check() {
        let tools = FakeTools::install();
        let ctx = tools.context(tools.config_builder().build().unwrap());
        let state = JobState::new("run-1");

        let err = ExtractStep::new().validate_input(&ctx, &state).unwrap_err();
        assert!(matches!(err, StepError::PreconditionFailed(_)));
    }

    #[test]
    fn zero_frames_is_an_error() {
        let tools = FakeTools::install();
        // 5 fps makes the fake extractor write 5 / 10 = 0 frames.
        let ctx = tools.context(tools.config_builder().extract_fps(5).build().unwrap());
        let mut state = JobState::new("run-1");
        DependencyCheckStep::new().execute(&ctx, &mut state).unwrap();

        let err = ExtractStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::InvalidFrames(_)));
        assert!(state.extract.is_none());
    }
}
