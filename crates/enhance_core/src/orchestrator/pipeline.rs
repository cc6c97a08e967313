//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::models::PipelineStage;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, JobState};

/// Pipeline that runs a sequence of steps.
///
/// The pipeline executes steps in order, running validation before
/// and after each step. It moves the run through its lifecycle stages,
/// handles cancellation and tracks which steps were executed.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
    /// Cancellation flag.
    cancel: CancelHandle,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Use an externally created cancellation handle (e.g. one a signal
    /// handler already holds).
    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Get a cancellation handle.
    ///
    /// Call `cancel()` on the returned handle to stop the pipeline. A tool
    /// that is running is killed; otherwise the run stops at the next
    /// step boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Check if pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the pipeline with the given context and state.
    ///
    /// Executes each step in order:
    /// 1. Check for cancellation
    /// 2. Skip the step if it is optional and reports a skip reason
    /// 3. Enter the step's stage
    /// 4. Run `validate_input`, `execute` and `validate_output`
    ///
    /// On success the state ends in `Done`. On failure it ends in
    /// `Failed` (or `Interrupted` when cancelled) and the first error
    /// is returned; no later step runs.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult {
            steps_completed: Vec::new(),
            steps_skipped: Vec::new(),
        };
        let total = self.steps.len();
        let run_started = Instant::now();

        for (i, step) in self.steps.iter().enumerate() {
            let step_name = step.name();

            if self.is_cancelled() || ctx.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                let error = StepError::Cancelled(step_name.to_string());
                return Err(self.fail(ctx, state, step_name, error));
            }

            if let Some(reason) = step.skip_reason(ctx) {
                if !step.is_optional() {
                    let error = StepError::precondition_failed(format!(
                        "required step '{}' asked to be skipped: {}",
                        step_name, reason
                    ));
                    return Err(self.fail(ctx, state, step_name, error));
                }
                ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                result.steps_skipped.push(step_name.to_string());
                continue;
            }

            if let Err(e) = state.enter(step.stage()) {
                return Err(self.fail(ctx, state, step_name, e));
            }
            ctx.logger
                .phase(&format!("[{}/{}] {}", i + 1, total, step.description()));
            let started = Instant::now();

            if let Err(e) = step.validate_input(ctx, state) {
                ctx.logger.error(&format!("Input validation failed: {}", e));
                return Err(self.fail(ctx, state, step_name, e));
            }

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            if let Err(e) = step.execute(ctx, state) {
                ctx.logger.error(&format!("Execution failed: {}", e));
                return Err(self.fail(ctx, state, step_name, e));
            }

            if let Err(e) = step.validate_output(ctx, state) {
                ctx.logger.error(&format!("Output validation failed: {}", e));
                return Err(self.fail(ctx, state, step_name, e));
            }

            ctx.logger.finished(step_name, None, started.elapsed());
            result.steps_completed.push(step_name.to_string());
        }

        if let Err(e) = state.enter(PipelineStage::Done) {
            return Err(self.fail(ctx, state, "Finish", e));
        }

        ctx.logger.finished("Pipeline", None, run_started.elapsed());
        Ok(result)
    }

    /// Move the run to its terminal failure stage and build the error.
    fn fail(
        &self,
        ctx: &Context,
        state: &mut JobState,
        step_name: &str,
        error: StepError,
    ) -> PipelineError {
        if error.is_cancelled() {
            state.abort(PipelineStage::Interrupted, error.to_string());
            ctx.logger.warn("Pipeline interrupted by user");
            return PipelineError::cancelled(&ctx.run_name, step_name);
        }

        state.abort(PipelineStage::Failed, error.to_string());
        ctx.logger.show_tail(step_name);
        PipelineError::step_failed(&ctx.run_name, step_name, error)
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for cancelling a running pipeline.
///
/// Cloning shares the flag, so a signal handler and the pipeline can
/// each hold one.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, not-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pipeline.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
}
