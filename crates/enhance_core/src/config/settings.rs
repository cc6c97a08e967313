//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default, so a partial file still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::{
    PipelineConfigBuilder, DEFAULT_CRF, DEFAULT_EXTRACT_FPS, DEFAULT_SCALE, DEFAULT_TARGET_FPS,
};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Stage parameters.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Start a `PipelineConfig` for `input` with every default taken from
    /// these settings. CLI flags are applied on the returned builder.
    pub fn pipeline_builder(&self, input: impl Into<PathBuf>) -> PipelineConfigBuilder {
        let timeout = match self.pipeline.stage_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        PipelineConfigBuilder::new(input)
            .extract_fps(self.pipeline.extract_fps)
            .target_fps(self.pipeline.target_fps)
            .scale(self.pipeline.scale)
            .crf(self.pipeline.crf)
            .bin_dir(&self.tools.bin_dir)
            .stage_timeout(timeout)
            .keep_work_dir(self.pipeline.keep_work_dir)
    }

    /// Configured FFmpeg path, `None` when it should be searched on PATH.
    pub fn ffmpeg_override(&self) -> Option<&Path> {
        if self.tools.ffmpeg_path.trim().is_empty() {
            None
        } else {
            Some(Path::new(&self.tools.ffmpeg_path))
        }
    }

    /// Job logger configuration derived from the logging section.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: LogLevel::Info,
            compact: self.logging.compact,
            error_tail: self.logging.error_tail as usize,
            show_timestamps: self.logging.show_timestamps,
        }
    }
}

/// Identifies one section of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Pipeline,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Pipeline,
        ConfigSection::Logging,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Pipeline => "pipeline",
            ConfigSection::Logging => "logging",
        }
    }

    /// Section stored under `name`, if any.
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.table_name() == name)
    }

    /// Comment written above the section.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Working and log directories",
            ConfigSection::Tools => "External tool locations",
            ConfigSection::Pipeline => "Stage parameters",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

/// Path configuration for temp and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for per-run working directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for run logs and manifests.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Directory holding the rife/realesrgan ncnn folders.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,

    /// Explicit FFmpeg executable (empty = search PATH).
    #[serde(default)]
    pub ffmpeg_path: String,
}

fn default_bin_dir() -> String {
    "./bin".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            ffmpeg_path: String::new(),
        }
    }
}

/// Stage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Frame extraction rate.
    #[serde(default = "default_extract_fps")]
    pub extract_fps: u32,

    /// Interpolation target rate.
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Upscale factor (2, 3 or 4).
    #[serde(default = "default_scale")]
    pub scale: u32,

    /// x264 CRF for the final encode.
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// RIFE model directory name.
    #[serde(default = "default_interpolation_model")]
    pub interpolation_model: String,

    /// Real-ESRGAN model name.
    #[serde(default = "default_upscale_model")]
    pub upscale_model: String,

    /// Value passed to Real-ESRGAN's `-n` option.
    #[serde(default = "default_upscale_threads")]
    pub upscale_threads: String,

    /// Per-stage timeout in seconds (0 = no timeout).
    #[serde(default)]
    pub stage_timeout_secs: u64,

    /// Keep the per-run working directory after the run.
    #[serde(default)]
    pub keep_work_dir: bool,
}

fn default_extract_fps() -> u32 {
    DEFAULT_EXTRACT_FPS
}

fn default_target_fps() -> u32 {
    DEFAULT_TARGET_FPS
}

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

fn default_crf() -> u8 {
    DEFAULT_CRF
}

fn default_interpolation_model() -> String {
    "models-ensemble".to_string()
}

fn default_upscale_model() -> String {
    "realesrgan-x4plus-anime".to_string()
}

fn default_upscale_threads() -> String {
    "4".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            extract_fps: default_extract_fps(),
            target_fps: default_target_fps(),
            scale: default_scale(),
            crf: default_crf(),
            interpolation_model: default_interpolation_model(),
            upscale_model: default_upscale_model(),
            upscale_threads: default_upscale_threads(),
            stage_timeout_secs: 0,
            keep_work_dir: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Keep raw tool output out of the console (tail shown on error).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines kept for error reports.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let settings: Settings = toml::from_str("[pipeline]\ncrf = 20\n").unwrap();
        assert_eq!(settings.pipeline.crf, 20);
        assert_eq!(settings.pipeline.extract_fps, 30);
        assert_eq!(settings.tools.bin_dir, "./bin");
        assert_eq!(settings.pipeline.upscale_model, "realesrgan-x4plus-anime");
    }

    #[test]
    fn sections_resolve_by_table_name() {
        for section in ConfigSection::ALL {
            assert_eq!(ConfigSection::from_table_name(section.table_name()), Some(section));
        }
        assert_eq!(ConfigSection::from_table_name("habits"), None);
    }

    #[test]
    fn builder_inherits_settings() {
        let mut settings = Settings::default();
        settings.pipeline.target_fps = 48;
        settings.pipeline.stage_timeout_secs = 90;
        settings.tools.bin_dir = "/opt/ncnn".to_string();

        let config = settings.pipeline_builder("in.mp4").build().unwrap();
        assert_eq!(config.target_fps(), 48);
        assert_eq!(config.stage_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.bin_dir(), Path::new("/opt/ncnn"));
    }

    #[test]
    fn empty_ffmpeg_path_means_search() {
        let mut settings = Settings::default();
        assert!(settings.ffmpeg_override().is_none());

        settings.tools.ffmpeg_path = "/usr/local/bin/ffmpeg".to_string();
        assert_eq!(
            settings.ffmpeg_override(),
            Some(Path::new("/usr/local/bin/ffmpeg"))
        );
    }
}
