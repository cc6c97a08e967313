//! Run driver: sets up one enhancement run, executes the standard
//! pipeline and cleans up after it.
//!
//! Order of work:
//! 1. Verify the input exists (fails before any tool is probed)
//! 2. Create `<temp_root>/run-<uuid>` and the run logger
//! 3. Run the pipeline
//! 4. Write the JobState manifest next to the run log
//! 5. Remove the working directory unless asked to keep it

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Settings;
use crate::logging::{LogCallback, LogConfig, RunLogger};
use crate::models::PipelineConfig;

use super::create_standard_pipeline;
use super::errors::{PipelineError, PipelineResult, StepError};
use super::pipeline::CancelHandle;
use super::types::{Context, JobState};

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,
    /// Path to the encoded video.
    pub output_path: PathBuf,
    /// Size of the encoded video.
    pub file_size_bytes: u64,
    /// Rate the video was encoded at.
    pub frame_rate: u32,
    /// Steps that did work.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
    /// Run log file.
    pub log_path: PathBuf,
    /// JobState manifest, when it could be written.
    pub manifest_path: Option<PathBuf>,
    /// Working directory, when it was kept.
    pub work_dir: Option<PathBuf>,
}

impl RunSummary {
    /// Output size in megabytes.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Runs one enhancement job end to end.
pub struct Enhancer {
    settings: Settings,
    cancel: CancelHandle,
    log_config: Option<LogConfig>,
    log_callback: Option<LogCallback>,
}

impl Enhancer {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cancel: CancelHandle::new(),
            log_config: None,
            log_callback: None,
        }
    }

    /// Override the run logger configuration derived from settings.
    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = Some(config);
        self
    }

    /// Send run log lines to `callback` as well as the log file.
    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    /// Handle that interrupts the run when cancelled. Safe to hand to a
    /// signal handler before `run` is called.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run the pipeline for `config`.
    pub fn run(self, config: PipelineConfig) -> PipelineResult<RunSummary> {
        let Enhancer {
            settings,
            cancel,
            log_config,
            log_callback,
        } = self;

        if !config.input().is_file() {
            return Err(PipelineError::InputNotFound(config.input().to_path_buf()));
        }

        let run_id = Uuid::new_v4().to_string();
        let run_name = run_name(config.input(), &run_id);

        let work_dir = Path::new(&settings.paths.temp_root).join(format!("run-{}", run_id));
        fs::create_dir_all(&work_dir).map_err(|e| {
            PipelineError::setup_failed(
                &run_name,
                format!("cannot create working directory {}: {}", work_dir.display(), e),
            )
        })?;

        let logs_folder = PathBuf::from(&settings.paths.logs_folder);
        let log_config = log_config.unwrap_or_else(|| settings.log_config());
        let logger = match RunLogger::new(&run_name, &logs_folder, log_config, log_callback) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                remove_work_dir(&work_dir);
                return Err(PipelineError::setup_failed(
                    &run_name,
                    format!("cannot open run log in {}: {}", logs_folder.display(), e),
                ));
            }
        };

        tracing::info!("Starting run {} for {}", run_name, config.input().display());
        logger.info(&format!("Input: {}", config.input().display()));
        logger.info(&format!("Output: {}", config.output().display()));
        logger.info(&format!("Working directory: {}", work_dir.display()));

        let keep_work_dir = config.keep_work_dir();
        let pipeline = create_standard_pipeline().with_cancel_handle(cancel.clone());
        logger.debug(&format!("Steps: {}", pipeline.step_names().join(" -> ")));
        let ctx = Context::new(config, settings, &run_name, work_dir.clone(), Arc::clone(&logger))
            .with_cancel_handle(cancel);

        let mut state = JobState::new(&run_id);
        let outcome = pipeline.run(&ctx, &mut state);

        let manifest_path = write_manifest(&logger, &logs_folder, &run_name, &state);

        let kept_work_dir = if keep_work_dir {
            logger.info(&format!("Keeping working directory {}", work_dir.display()));
            Some(work_dir)
        } else {
            if let Err(e) = fs::remove_dir_all(&work_dir) {
                logger.warn(&format!(
                    "Could not remove working directory {}: {}",
                    work_dir.display(),
                    e
                ));
            }
            None
        };

        let log_path = logger.log_path().to_path_buf();
        logger.flush();

        let result = outcome?;
        let encoded = state.encode.ok_or_else(|| {
            PipelineError::step_failed(
                &run_name,
                "Encode",
                StepError::invalid_output("pipeline finished without an output"),
            )
        })?;

        tracing::info!("Run {} finished: {}", run_name, encoded.output_path.display());

        Ok(RunSummary {
            run_id,
            output_path: encoded.output_path,
            file_size_bytes: encoded.file_size_bytes,
            frame_rate: encoded.frame_rate,
            steps_completed: result.steps_completed,
            steps_skipped: result.steps_skipped,
            log_path,
            manifest_path,
            work_dir: kept_work_dir,
        })
    }
}

/// `<input stem>_<first uuid group>`, e.g. `clip_1b4e28ba`.
fn run_name(input: &Path, run_id: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "run".to_string());
    let short = run_id.split('-').next().unwrap_or(run_id);
    format!("{}_{}", stem, short)
}

fn write_manifest(
    logger: &RunLogger,
    logs_folder: &Path,
    run_name: &str,
    state: &JobState,
) -> Option<PathBuf> {
    let path = logs_folder.join(format!("{}.json", run_name));
    let written = serde_json::to_string_pretty(state)
        .map_err(|e| e.to_string())
        .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));

    match written {
        Ok(()) => Some(path),
        Err(e) => {
            logger.warn(&format!("Could not write run manifest {}: {}", path.display(), e));
            None
        }
    }
}

fn remove_work_dir(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        tracing::warn!("Could not remove working directory {}: {}", dir.display(), e);
    }
}
