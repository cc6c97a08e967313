//! Pipeline step trait definition.
//!
//! All pipeline steps implement this trait, providing a consistent
//! interface for validation and execution.

use crate::models::PipelineStage;

use super::errors::StepResult;
use super::types::{Context, JobState};

/// Trait for pipeline steps.
///
/// Each step in the pipeline implements this trait. The pipeline runner
/// calls these methods in order:
///
/// 1. `skip_reason` - Decide whether the step runs at all
/// 2. `validate_input` - Check preconditions before execution
/// 3. `execute` - Perform the step's work
/// 4. `validate_output` - Verify the step produced valid output
///
/// A step that is skipped never enters its stage, so the run's
/// stage history only lists stages that did work.
///
/// # Example
///
/// ```ignore
/// struct ExtractStep;
///
/// impl PipelineStep for ExtractStep {
///     fn name(&self) -> &str { "Extract" }
///     fn stage(&self) -> PipelineStage { PipelineStage::Extracting }
///
///     fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
///         state.require_tools().map(|_| ())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
///         // Run FFmpeg...
///         state.extract = Some(StageResult { ... });
///         Ok(())
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
///         verify_frames(state.extract.as_ref(), "Extraction")
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Lifecycle stage the run is in while this step works.
    fn stage(&self) -> PipelineStage;

    /// Reason to skip this step for the current run, if any.
    ///
    /// Only optional steps may return `Some`; the pipeline fails a
    /// required step that asks to be skipped. Default is `None`.
    fn skip_reason(&self, _ctx: &Context) -> Option<String> {
        None
    }

    /// Validate inputs before execution.
    ///
    /// Should check that everything earlier steps were supposed to
    /// produce is recorded in `state`.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Should perform the step's processing and record results in `state`.
    /// Use `ctx.logger` for logging and `ctx.run_tool()` for external tools.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()>;

    /// Validate outputs after execution.
    ///
    /// Called after `execute` returns `Ok`. The next step never
    /// sees output that failed this check.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Whether `skip_reason` may skip this step.
    ///
    /// Default is `false` (step is required).
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep {
        name: &'static str,
    }

    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            self.name
        }

        fn stage(&self) -> PipelineStage {
            PipelineStage::Encoding
        }

        fn validate_input(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut JobState) -> StepResult<()> {
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep { name: "TestStep" });

        assert_eq!(step.name(), "TestStep");
        assert_eq!(step.description(), "TestStep");
        assert_eq!(step.stage(), PipelineStage::Encoding);
        assert!(!step.is_optional());
    }
}
