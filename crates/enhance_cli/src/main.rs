//! video-enhancer binary entry point.
//!
//! Extracts frames with FFmpeg, optionally interpolates them with RIFE and
//! upscales them with Real-ESRGAN, then encodes the result with x264.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser};

use enhance_core::config::ConfigManager;
use enhance_core::logging::{init_tracing, LogConfig, LogLevel};
use enhance_core::orchestrator::{Enhancer, PipelineError, RunSummary};

/// Enhance a video: extract frames, interpolate, upscale and re-encode.
#[derive(Parser, Debug)]
#[command(name = "video-enhancer", version, about)]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Output file (default: <input-stem>_enhanced.<ext> in the current directory)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Skip frame interpolation (RIFE)
    #[arg(long, action = ArgAction::SetTrue)]
    skip_interpolation: bool,

    /// Skip upscaling (Real-ESRGAN)
    #[arg(long, action = ArgAction::SetTrue)]
    skip_upscale: bool,

    /// Directory holding rife-ncnn-vulkan/ and realesrgan-ncnn-vulkan/
    #[arg(long)]
    bin_dir: Option<PathBuf>,

    /// Settings file (created with defaults when missing)
    #[arg(long, default_value = ".config/enhancer.toml")]
    config: PathBuf,

    /// Frame extraction rate
    #[arg(long)]
    fps: Option<u32>,

    /// Interpolation target rate
    #[arg(long)]
    target_fps: Option<u32>,

    /// Upscale factor (2, 3 or 4)
    #[arg(long)]
    scale: Option<u32>,

    /// x264 CRF for the final encode (0-51)
    #[arg(long)]
    crf: Option<u8>,

    /// Kill any single stage that runs longer than this many seconds (0 = no limit)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Keep the per-run working directory (frames and tool output)
    #[arg(long, action = ArgAction::SetTrue)]
    keep_temp: bool,

    /// Verbose diagnostics and raw tool output
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    match run(cli) {
        Ok(summary) => {
            println!();
            println!(
                "Enhanced video written to {} ({:.2} MB, {} fps)",
                summary.output_path.display(),
                summary.file_size_mb(),
                summary.frame_rate
            );
            println!("Log: {}", summary.log_path.display());
            if let Some(dir) = &summary.work_dir {
                println!("Working files kept in {}", dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary> {
    let settings = ConfigManager::new(&cli.config)
        .load_or_create()
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    let mut builder = settings
        .pipeline_builder(&cli.input)
        .output(cli.output)
        .skip_interpolation(cli.skip_interpolation)
        .skip_upscale(cli.skip_upscale);

    if let Some(dir) = cli.bin_dir {
        builder = builder.bin_dir(dir);
    }
    if let Some(fps) = cli.fps {
        builder = builder.extract_fps(fps);
    }
    if let Some(fps) = cli.target_fps {
        builder = builder.target_fps(fps);
    }
    if let Some(scale) = cli.scale {
        builder = builder.scale(scale);
    }
    if let Some(crf) = cli.crf {
        builder = builder.crf(crf);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.stage_timeout(Some(Duration::from_secs(secs)));
    }
    if cli.keep_temp {
        builder = builder.keep_work_dir(true);
    }

    let config = builder.build().context("Invalid options")?;

    let verbose_log = cli.verbose.then(|| LogConfig {
        show_timestamps: settings.logging.show_timestamps,
        ..LogConfig::debug()
    });

    let mut enhancer =
        Enhancer::new(settings).with_log_callback(Box::new(|line| println!("{}", line)));
    if let Some(log_config) = verbose_log {
        enhancer = enhancer.with_log_config(log_config);
    }

    let handle = enhancer.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping...");
        handle.cancel();
    }) {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }

    Ok(enhancer.run(config)?)
}

fn report_error(err: &anyhow::Error) {
    for line in error_lines(err) {
        eprintln!("{}", line);
    }
}

/// What the user sees on stderr for a failed run.
fn error_lines(err: &anyhow::Error) -> Vec<String> {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline_err) if pipeline_err.is_interrupted() => {
            vec!["Pipeline interrupted by user".to_string()]
        }
        Some(pipeline_err) => {
            let mut lines = vec![format!("Error: {}", pipeline_err)];
            if let Some(hint) = pipeline_err.hint() {
                lines.extend(hint.lines().map(|line| format!("  hint: {}", line)));
            }
            lines
        }
        None => vec![format!("Error: {:#}", err)],
    }
}
