//! Dependency check step - verifies the external tools exist.
//!
//! Every tool is probed before any work starts. The report lists all
//! missing tools, not just the first.

use crate::models::PipelineStage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::tools::probe_tools;

/// Probes RIFE, Real-ESRGAN and FFmpeg and records their paths.
pub struct DependencyCheckStep;

impl DependencyCheckStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DependencyCheckStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for DependencyCheckStep {
    fn name(&self) -> &str {
        "DependencyCheck"
    }

    fn description(&self) -> &str {
        "Checking dependencies"
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::DependencyCheck
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !ctx.config.input().is_file() {
            return Err(StepError::precondition_failed(format!(
                "input file not found: {}",
                ctx.config.input().display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let report = probe_tools(ctx.config.bin_dir(), ctx.settings.ffmpeg_override());

        for line in report.status_lines() {
            ctx.logger.validation(&line);
        }

        for missing in report.missing() {
            ctx.logger.error(&format!(
                "{} not found. {}",
                missing.kind,
                missing.kind.remediation_hint()
            ));
        }

        let tools = report.into_tool_set().map_err(StepError::from)?;
        state.tools = Some(tools);

        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        state.require_tools().map(|_| ())
    }
}
