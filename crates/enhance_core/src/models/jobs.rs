//! Job-level configuration for a single enhancement run.

use std::path::{self, Component, Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default frame extraction rate.
pub const DEFAULT_EXTRACT_FPS: u32 = 30;

/// Default interpolation target rate.
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Default upscale factor.
pub const DEFAULT_SCALE: u32 = 4;

/// Default x264 constant-rate-factor (lower = better quality, bigger file).
pub const DEFAULT_CRF: u8 = 18;

/// Scale factors supported by the upscaler models.
const SUPPORTED_SCALES: [u32; 3] = [2, 3, 4];

/// Highest CRF accepted by libx264.
const MAX_CRF: u8 = 51;

/// Highest frame rate accepted for extraction or interpolation.
const MAX_FPS: u32 = 240;

/// Invalid values rejected when building a `PipelineConfig`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Frame rate must be between 1 and {max}, got {value}")]
    InvalidFrameRate { value: u32, max: u32 },

    #[error("Upscale factor must be one of 2, 3 or 4, got {0}")]
    InvalidScale(u32),

    #[error("CRF must be between 0 and {max}, got {value}")]
    InvalidCrf { value: u8, max: u8 },

    #[error("Output path must differ from the input path: {0}")]
    OutputIsInput(PathBuf),
}

/// Immutable description of one enhancement run.
///
/// Built once through [`PipelineConfigBuilder`] and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    input: PathBuf,
    output: PathBuf,
    extract_fps: u32,
    target_fps: u32,
    scale: u32,
    crf: u8,
    skip_interpolation: bool,
    skip_upscale: bool,
    bin_dir: PathBuf,
    stage_timeout: Option<Duration>,
    keep_work_dir: bool,
}

impl PipelineConfig {
    /// Start building a config for the given input video.
    pub fn builder(input: impl Into<PathBuf>) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(input)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Sampling rate used when extracting frames.
    pub fn extract_fps(&self) -> u32 {
        self.extract_fps
    }

    /// Frame rate the interpolator aims for.
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn crf(&self) -> u8 {
        self.crf
    }

    pub fn skip_interpolation(&self) -> bool {
        self.skip_interpolation
    }

    pub fn skip_upscale(&self) -> bool {
        self.skip_upscale
    }

    /// Directory holding the ncnn executables.
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Per-stage wall-clock limit (`None` = wait indefinitely).
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout
    }

    pub fn keep_work_dir(&self) -> bool {
        self.keep_work_dir
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    input: PathBuf,
    output: Option<PathBuf>,
    extract_fps: u32,
    target_fps: u32,
    scale: u32,
    crf: u8,
    skip_interpolation: bool,
    skip_upscale: bool,
    bin_dir: PathBuf,
    stage_timeout: Option<Duration>,
    keep_work_dir: bool,
}

impl PipelineConfigBuilder {
    /// Create a builder with default settings.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            extract_fps: DEFAULT_EXTRACT_FPS,
            target_fps: DEFAULT_TARGET_FPS,
            scale: DEFAULT_SCALE,
            crf: DEFAULT_CRF,
            skip_interpolation: false,
            skip_upscale: false,
            bin_dir: PathBuf::from("./bin"),
            stage_timeout: None,
            keep_work_dir: false,
        }
    }

    /// Set the output path (`None` derives it from the input name).
    pub fn output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn extract_fps(mut self, fps: u32) -> Self {
        self.extract_fps = fps;
        self
    }

    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn skip_interpolation(mut self, skip: bool) -> Self {
        self.skip_interpolation = skip;
        self
    }

    pub fn skip_upscale(mut self, skip: bool) -> Self {
        self.skip_upscale = skip;
        self
    }

    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    /// Set the per-stage timeout. A zero duration means no timeout.
    pub fn stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    /// Validate and build the config.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        for fps in [self.extract_fps, self.target_fps] {
            if fps == 0 || fps > MAX_FPS {
                return Err(ConfigValidationError::InvalidFrameRate {
                    value: fps,
                    max: MAX_FPS,
                });
            }
        }

        if !SUPPORTED_SCALES.contains(&self.scale) {
            return Err(ConfigValidationError::InvalidScale(self.scale));
        }

        if self.crf > MAX_CRF {
            return Err(ConfigValidationError::InvalidCrf {
                value: self.crf,
                max: MAX_CRF,
            });
        }

        let output = self
            .output
            .unwrap_or_else(|| default_output_path(&self.input));
        if same_location(&output, &self.input) {
            return Err(ConfigValidationError::OutputIsInput(output));
        }

        Ok(PipelineConfig {
            input: self.input,
            output,
            extract_fps: self.extract_fps,
            target_fps: self.target_fps,
            scale: self.scale,
            crf: self.crf,
            skip_interpolation: self.skip_interpolation,
            skip_upscale: self.skip_upscale,
            bin_dir: self.bin_dir,
            stage_timeout: self.stage_timeout,
            keep_work_dir: self.keep_work_dir,
        })
    }
}

/// Whether two paths name the same file, seen through `.`, `..`, symlinks
/// and relative spellings. Neither path has to exist.
fn same_location(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b) || lexical(a) == lexical(b)
}

/// Canonical path, or the canonical parent joined with the file name when
/// the file itself does not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => lexical(path),
    }
}

/// Absolute path with `.` and `..` folded away, without touching the disk.
fn lexical(path: &Path) -> PathBuf {
    let absolute = path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

/// Default output path: `<input-stem>_enhanced.<ext>` in the current
/// directory, using the input's extension (or `mp4` if it has none).
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "mp4".to_string());

    PathBuf::from(format!("{}_enhanced.{}", stem, ext))
}
