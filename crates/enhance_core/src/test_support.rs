//! Fake external tools for tests.
//!
//! The scripts honour the same argument layout the pipeline steps use,
//! so whole runs can be exercised without FFmpeg or a GPU:
//!
//! - `ffmpeg` extraction writes `fps / 10` frames (4x2 px)
//! - `ffmpeg` encoding writes `fps=<n> crf=<n> frames=<n>` to the output file
//! - `rife-ncnn-vulkan` writes `-n` copies of the first input frame
//! - `realesrgan-ncnn-vulkan` writes one frame per input, `-s` times larger

use std::env::consts::EXE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::Settings;
use crate::logging::{LogConfig, RunLogger};
use crate::models::{PipelineConfig, PipelineConfigBuilder, ToolKind};
use crate::orchestrator::Context;
use crate::tools::probe::bundled_tool_path;

/// Width/height of an extracted fake frame.
pub const FRAME_WIDTH: u32 = 4;
pub const FRAME_HEIGHT: u32 = 2;

/// Write an executable `/bin/sh` script and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// A throwaway bin directory plus an FFmpeg stand-in.
pub struct FakeTools {
    root: TempDir,
    bin_dir: PathBuf,
    ffmpeg: PathBuf,
}

impl FakeTools {
    /// Install all three working fake tools.
    pub fn install() -> Self {
        let root = TempDir::new().unwrap();
        let bin_dir = root.path().join("bin");
        let templates = root.path().join("templates");
        fs::create_dir_all(&templates).unwrap();

        for factor in 1..=4u32 {
            image::RgbImage::new(FRAME_WIDTH * factor, FRAME_HEIGHT * factor)
                .save(templates.join(format!("frame_x{}.png", factor)))
                .unwrap();
        }

        let tools = Self {
            ffmpeg: root.path().join(format!("ffmpeg{}", EXE_SUFFIX)),
            root,
            bin_dir,
        };

        tools.replace(ToolKind::Ffmpeg, &ffmpeg_body(&templates, true));
        tools.replace(
            ToolKind::Rife,
            concat!(
                "i=1\n",
                "while [ $i -le \"$8\" ]; do\n",
                "  cp \"$2/000001.png\" \"$4/$(printf %06d $i).png\"\n",
                "  i=$((i + 1))\n",
                "done\n",
            ),
        );
        tools.replace(
            ToolKind::RealEsrgan,
            &format!(
                concat!(
                    "for f in \"$2\"/*.png; do\n",
                    "  cp \"{}/frame_x$6.png\" \"$4/$(basename \"$f\")\"\n",
                    "done\n",
                ),
                templates.display()
            ),
        );

        tools
    }

    /// Install working tools except for an encoder that fails.
    pub fn with_failing_encoder() -> Self {
        let tools = Self::install();
        let templates = tools.root.path().join("templates");
        tools.replace(ToolKind::Ffmpeg, &ffmpeg_body(&templates, false));
        tools
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Scratch directory owned by this fixture.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create a dummy input video and return its path.
    pub fn input_video(&self) -> PathBuf {
        let path = self.root.path().join("clip.mp4");
        fs::write(&path, b"not really a video").unwrap();
        path
    }

    /// Path the given tool is installed at.
    pub fn path_of(&self, kind: ToolKind) -> PathBuf {
        match kind {
            ToolKind::Ffmpeg => self.ffmpeg.clone(),
            _ => bundled_tool_path(&self.bin_dir, kind),
        }
    }

    /// Replace a tool's script body.
    pub fn replace(&self, kind: ToolKind, body: &str) {
        let path = self.path_of(kind);
        let parent = path.parent().unwrap();
        fs::create_dir_all(parent).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        write_script(parent, &name, body);
    }

    /// Delete a tool.
    pub fn remove(&self, kind: ToolKind) {
        fs::remove_file(self.path_of(kind)).unwrap();
    }

    /// Settings pointing at the fake tools, with temp and log folders
    /// inside the fixture.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.tools.bin_dir = self.bin_dir.to_string_lossy().to_string();
        settings.tools.ffmpeg_path = self.ffmpeg.to_string_lossy().to_string();
        settings.paths.temp_root = self.root().join(".temp").to_string_lossy().to_string();
        settings.paths.logs_folder = self.root().join(".logs").to_string_lossy().to_string();
        settings
    }

    /// Config builder for the fixture's input video, writing `out.mp4`
    /// inside the fixture.
    pub fn config_builder(&self) -> PipelineConfigBuilder {
        self.settings()
            .pipeline_builder(self.input_video())
            .output(Some(self.root().join("out.mp4")))
    }

    /// Step context over a fresh working directory inside the fixture.
    pub fn context(&self, config: PipelineConfig) -> Context {
        context_with(config, self.settings(), self.root())
    }
}

/// Context over a scratch directory with default settings and no tools.
pub fn test_context() -> (Context, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::builder(dir.path().join("clip.mp4"))
        .output(Some(dir.path().join("out.mp4")))
        .build()
        .unwrap();
    let ctx = context_with(config, Settings::default(), dir.path());
    (ctx, dir)
}

fn context_with(config: PipelineConfig, settings: Settings, root: &Path) -> Context {
    let work_dir = root.join("work");
    fs::create_dir_all(&work_dir).unwrap();
    let logger = RunLogger::new("test_run", root.join("logs"), LogConfig::default(), None).unwrap();
    Context::new(config, settings, "test_run", work_dir, Arc::new(logger))
}

fn ffmpeg_body(templates: &Path, encode_ok: bool) -> String {
    let encode = if encode_ok {
        concat!(
            "  frames=$(ls \"$(dirname \"$5\")\" | grep -c '\\.png$')\n",
            "  printf 'fps=%s crf=%s frames=%s\\n' \"$3\" \"${11}\" \"$frames\" > \"${15}\"\n",
            "  exit 0\n",
        )
        .to_string()
    } else {
        concat!(
            "  printf 'partial' > \"${15}\"\n",
            "  echo \"[libx264 @ 0x1] broken pipe while encoding\" >&2\n",
            "  exit 1\n",
        )
        .to_string()
    };

    format!(
        concat!(
            "if [ \"$2\" = \"-i\" ]; then\n",
            "  dir=$(dirname \"$8\")\n",
            "  n=$(( $5 / 10 ))\n",
            "  i=1\n",
            "  while [ $i -le $n ]; do\n",
            "    cp \"{templates}/frame_x1.png\" \"$dir/$(printf %06d $i).png\"\n",
            "    i=$((i + 1))\n",
            "  done\n",
            "  exit 0\n",
            "fi\n",
            "if [ \"$2\" = \"-framerate\" ]; then\n",
            "{encode}",
            "fi\n",
            "echo \"unexpected arguments: $*\" >&2\n",
            "exit 2\n",
        ),
        templates = templates.display(),
        encode = encode,
    )
}
