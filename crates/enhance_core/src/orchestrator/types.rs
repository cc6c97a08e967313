//! Core types for the orchestrator pipeline.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::logging::RunLogger;
use crate::models::{FrameSequence, PipelineConfig, PipelineStage};
use crate::tools::{run_tool, RunLimits, ToolCommand, ToolError, ToolOutput, ToolSet};

use super::errors::{StepError, StepResult};
use super::pipeline::CancelHandle;

/// How long a failed tool is given for a pending Ctrl+C to raise the
/// cancel flag before the failure is reported as a failure.
const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Read-only context passed to pipeline steps.
///
/// Contains the run configuration and shared resources that steps can
/// read but not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// Validated run parameters.
    pub config: PipelineConfig,
    /// Application settings (model names, thread counts, paths).
    pub settings: Settings,
    /// Run name/identifier (used for the log file name).
    pub run_name: String,
    /// Run-specific working directory (under temp_root).
    pub work_dir: PathBuf,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    /// Cancellation flag shared with the pipeline and signal handler.
    cancel: CancelHandle,
}

impl Context {
    /// Create a new context for a run.
    pub fn new(
        config: PipelineConfig,
        settings: Settings,
        run_name: impl Into<String>,
        work_dir: PathBuf,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            config,
            settings,
            run_name: run_name.into(),
            work_dir,
            logger,
            cancel: CancelHandle::new(),
        }
    }

    /// Share an existing cancellation handle.
    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Whether the user asked to stop the run.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Create a stage's frame directory inside the working directory.
    pub fn create_stage_dir(&self, name: &str) -> StepResult<PathBuf> {
        let dir = self.work_dir.join(name);
        fs::create_dir_all(&dir)
            .map_err(|e| StepError::io_error(format!("create {}", dir.display()), e))?;
        Ok(dir)
    }

    /// Run an external tool with the run's timeout and cancellation,
    /// logging the command line and the tool's output.
    ///
    /// `label` names the capture files in the working directory.
    pub fn run_tool(&self, cmd: &ToolCommand, label: &str) -> StepResult<ToolOutput> {
        self.logger.command(&cmd.display());

        let limits = RunLimits {
            timeout: self.config.stage_timeout(),
        };
        let abort = || self.is_cancelled();

        match run_tool(cmd, &self.work_dir, label, &limits, &abort) {
            Ok(output) => {
                self.logger.tool_output(&output.stdout, false);
                self.logger.tool_output(&output.stderr, true);
                self.logger.debug(&format!(
                    "{} finished in {:.1}s",
                    cmd.kind(),
                    output.elapsed.as_secs_f64()
                ));
                Ok(output)
            }
            Err(err) => {
                if let ToolError::CommandFailed { ref message, .. } = err {
                    self.logger.tool_output(message, true);
                }
                if self.interrupted_by(&err) {
                    return Err(StepError::cancelled(cmd.kind()));
                }
                Err(err.into())
            }
        }
    }
}

impl Context {
    /// Whether a tool failure is really the user's Ctrl+C.
    ///
    /// The terminal delivers SIGINT to the child as well, and the child can
    /// exit before the handler thread raises the flag.
    fn interrupted_by(&self, err: &ToolError) -> bool {
        if self.is_cancelled() || matches!(err, ToolError::Cancelled { .. }) {
            return true;
        }
        if !matches!(err, ToolError::CommandFailed { .. }) {
            return false;
        }
        thread::sleep(CANCEL_GRACE);
        self.is_cancelled()
    }
}

/// Output of a frame-producing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Directory holding the stage's frames.
    pub output_dir: PathBuf,
    /// Number of frames written.
    pub frame_count: u32,
    /// Playback rate of these frames.
    pub frame_rate: u32,
    /// Exit code of the tool.
    pub exit_code: i32,
    /// Wall-clock time the tool took.
    pub elapsed_secs: f64,
}

impl StageResult {
    /// Frame sequence described by this result.
    pub fn sequence(&self) -> FrameSequence {
        FrameSequence {
            dir: self.output_dir.clone(),
            count: self.frame_count,
        }
    }
}

/// Output of the Encode step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOutput {
    /// Path to the encoded video.
    pub output_path: PathBuf,
    /// Size of the encoded file.
    pub file_size_bytes: u64,
    /// Frame rate the sequence was encoded at.
    pub frame_rate: u32,
    /// CRF used for the encode.
    pub crf: u8,
    /// Exit code of FFmpeg.
    pub exit_code: i32,
}

impl EncodeOutput {
    /// File size in megabytes.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// This is the "write-once manifest" - steps add new data but do not
/// overwrite what earlier steps recorded. It is written next to the
/// run log as JSON when the run ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// When the run reached a terminal stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Current lifecycle stage.
    pub stage: PipelineStage,
    /// Every stage entered, in order.
    pub history: Vec<PipelineStage>,
    /// Resolved tools (from DependencyCheck step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolSet>,
    /// Extraction results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<StageResult>,
    /// Interpolation results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolate: Option<StageResult>,
    /// Upscale results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upscale: Option<StageResult>,
    /// Encode results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode: Option<EncodeOutput>,
    /// Error that ended the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            history: vec![PipelineStage::Init],
            ..Default::default()
        }
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn enter(&mut self, next: PipelineStage) -> StepResult<()> {
        if !self.stage.can_transition_to(next) {
            return Err(StepError::precondition_failed(format!(
                "illegal stage transition {} -> {}",
                self.stage, next
            )));
        }

        self.stage = next;
        self.history.push(next);
        if next.is_terminal() {
            self.finished_at = Some(chrono::Local::now().to_rfc3339());
        }
        Ok(())
    }

    /// End the run in `Failed` or `Interrupted`, recording the error.
    ///
    /// Does nothing if the run already ended.
    pub fn abort(&mut self, terminal: PipelineStage, error: impl Into<String>) {
        if self.stage.is_terminal() {
            return;
        }
        if self.enter(terminal).is_ok() {
            self.error = Some(error.into());
        }
    }

    /// Tools resolved by the dependency check.
    pub fn require_tools(&self) -> StepResult<&ToolSet> {
        self.tools
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("dependency check has not run"))
    }

    /// Most recent frame sequence: upscaled, else interpolated, else extracted.
    pub fn latest_frames(&self) -> Option<&StageResult> {
        self.upscale
            .as_ref()
            .or(self.interpolate.as_ref())
            .or(self.extract.as_ref())
    }

    /// Rate the final video must be encoded at.
    pub fn output_frame_rate(&self) -> Option<u32> {
        self.latest_frames().map(|r| r.frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(dir: &str, count: u32, rate: u32) -> StageResult {
        StageResult {
            output_dir: PathBuf::from(dir),
            frame_count: count,
            frame_rate: rate,
            exit_code: 0,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn job_state_starts_in_init() {
        let state = JobState::new("run-1");
        assert_eq!(state.run_id, "run-1");
        assert!(state.started_at.is_some());
        assert_eq!(state.stage, PipelineStage::Init);
        assert!(state.latest_frames().is_none());
    }

    #[test]
    fn latest_frames_prefers_later_stages() {
        let mut state = JobState::new("run-1");
        state.extract = Some(stage("frames_extracted", 30, 30));
        assert_eq!(state.output_frame_rate(), Some(30));

        state.interpolate = Some(stage("frames_interpolated", 60, 60));
        assert_eq!(
            state.latest_frames().map(|r| r.output_dir.clone()),
            Some(PathBuf::from("frames_interpolated"))
        );

        state.upscale = Some(stage("frames_upscaled", 60, 60));
        assert_eq!(state.latest_frames().map(|r| r.frame_count), Some(60));
        assert_eq!(state.output_frame_rate(), Some(60));
    }

    #[test]
    fn enter_enforces_lifecycle() {
        let mut state = JobState::new("run-1");
        state.enter(PipelineStage::DependencyCheck).unwrap();
        state.enter(PipelineStage::Extracting).unwrap();
        state.enter(PipelineStage::Encoding).unwrap();

        assert!(state.enter(PipelineStage::Extracting).is_err());

        state.enter(PipelineStage::Done).unwrap();
        assert!(state.finished_at.is_some());
        assert_eq!(
            state.history,
            vec![
                PipelineStage::Init,
                PipelineStage::DependencyCheck,
                PipelineStage::Extracting,
                PipelineStage::Encoding,
                PipelineStage::Done,
            ]
        );
    }

    #[test]
    fn abort_records_error_once() {
        let mut state = JobState::new("run-1");
        state.enter(PipelineStage::DependencyCheck).unwrap();
        state.abort(PipelineStage::Failed, "ffmpeg missing");
        state.abort(PipelineStage::Interrupted, "late signal");

        assert_eq!(state.stage, PipelineStage::Failed);
        assert_eq!(state.error.as_deref(), Some("ffmpeg missing"));
    }

    #[test]
    fn job_state_serializes() {
        let mut state = JobState::new("run-1");
        state.extract = Some(stage("frames_extracted", 3, 30));

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("frames_extracted"));
        assert!(json.contains("\"stage\":\"init\""));
        assert!(!json.contains("upscale"));
    }

    #[cfg(unix)]
    #[test]
    fn failure_during_pending_interrupt_counts_as_cancellation() {
        use crate::models::ToolKind;
        use crate::test_support::{test_context, write_script};

        let (ctx, dir) = test_context();
        let handle = CancelHandle::new();
        let ctx = ctx.with_cancel_handle(handle.clone());
        let script = write_script(dir.path(), "rife.sh", "echo 'vkQueueSubmit failed' >&2\nexit 1\n");

        // The flag is raised after the tool has already exited non-zero.
        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });
        let err = ctx
            .run_tool(&ToolCommand::new(ToolKind::Rife, script), "interpolate")
            .unwrap_err();
        raiser.join().unwrap();

        assert!(err.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn failure_without_interrupt_stays_a_failure() {
        use crate::models::ToolKind;
        use crate::test_support::{test_context, write_script};

        let (ctx, dir) = test_context();
        let script = write_script(dir.path(), "rife.sh", "exit 3\n");

        let err = ctx
            .run_tool(&ToolCommand::new(ToolKind::Rife, script), "interpolate")
            .unwrap_err();

        assert!(!err.is_cancelled());
        assert!(matches!(err, StepError::CommandFailed { exit_code: 3, .. }));
    }

    #[test]
    fn encode_output_reports_megabytes() {
        let out = EncodeOutput {
            output_path: PathBuf::from("out.mp4"),
            file_size_bytes: 3 * 1024 * 1024,
            frame_rate: 60,
            crf: 18,
            exit_code: 0,
        };
        assert!((out.file_size_mb() - 3.0).abs() < f64::EPSILON);
    }
}
