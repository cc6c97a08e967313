//! Dependency probe for the external executables.
//!
//! The ncnn tools are looked up at fixed locations under the bin
//! directory. FFmpeg is taken from settings when a path is configured,
//! otherwise searched on `PATH`.

use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use crate::models::ToolKind;

use super::types::{ToolError, ToolRef, ToolResult, ToolSet};

/// Outcome of probing every required tool.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// One entry per tool, in probe order.
    pub tools: Vec<ToolRef>,
}

impl ProbeReport {
    /// Whether every tool was found.
    pub fn all_present(&self) -> bool {
        self.tools.iter().all(|t| t.exists)
    }

    /// Tools that were not found.
    pub fn missing(&self) -> Vec<&ToolRef> {
        self.tools.iter().filter(|t| !t.exists).collect()
    }

    /// Per-tool status lines (found/missing with resolved path).
    pub fn status_lines(&self) -> Vec<String> {
        self.tools.iter().map(ToolRef::status_line).collect()
    }

    /// Convert into a verified tool set, or fail with every missing tool.
    pub fn into_tool_set(self) -> ToolResult<ToolSet> {
        if !self.all_present() {
            let missing = self.tools.into_iter().filter(|t| !t.exists).collect();
            return Err(ToolError::Missing(missing));
        }

        let find = |kind: ToolKind| {
            self.tools
                .iter()
                .find(|t| t.kind == kind)
                .cloned()
                .ok_or_else(|| ToolError::Missing(Vec::new()))
        };

        Ok(ToolSet {
            rife: find(ToolKind::Rife)?,
            realesrgan: find(ToolKind::RealEsrgan)?,
            ffmpeg: find(ToolKind::Ffmpeg)?,
        })
    }
}

/// Probe every tool the pipeline needs.
///
/// # Arguments
/// * `bin_dir` - Directory containing the ncnn tool folders
/// * `ffmpeg_override` - Explicit FFmpeg path; `None` searches `PATH`
pub fn probe_tools(bin_dir: &Path, ffmpeg_override: Option<&Path>) -> ProbeReport {
    let tools = ToolKind::ALL
        .iter()
        .map(|kind| match kind {
            ToolKind::Rife | ToolKind::RealEsrgan => probe_bundled(bin_dir, *kind),
            ToolKind::Ffmpeg => probe_ffmpeg(ffmpeg_override),
        })
        .collect();

    ProbeReport { tools }
}

/// Expected location of a bundled ncnn tool.
pub(crate) fn bundled_tool_path(bin_dir: &Path, kind: ToolKind) -> PathBuf {
    let name = kind.executable_name();
    bin_dir.join(name).join(format!("{}{}", name, EXE_SUFFIX))
}

fn probe_bundled(bin_dir: &Path, kind: ToolKind) -> ToolRef {
    let path = bundled_tool_path(bin_dir, kind);
    let exists = path.is_file();

    tracing::debug!("Probed {} at {} (exists: {})", kind, path.display(), exists);

    ToolRef { kind, path, exists }
}

fn probe_ffmpeg(override_path: Option<&Path>) -> ToolRef {
    let kind = ToolKind::Ffmpeg;

    if let Some(path) = override_path {
        return ToolRef {
            kind,
            path: path.to_path_buf(),
            exists: path.is_file(),
        };
    }

    match which::which(kind.executable_name()) {
        Ok(path) => {
            tracing::debug!("Found {} on PATH: {}", kind, path.display());
            ToolRef {
                kind,
                path,
                exists: true,
            }
        }
        Err(e) => {
            tracing::debug!("{} not found on PATH: {}", kind, e);
            ToolRef {
                kind,
                path: PathBuf::from(kind.executable_name()),
                exists: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTools;
    use tempfile::tempdir;

    #[test]
    fn bundled_paths_follow_layout() {
        let path = bundled_tool_path(Path::new("bin"), ToolKind::RealEsrgan);
        assert!(path.starts_with("bin/realesrgan-ncnn-vulkan"));
        assert!(path
            .to_string_lossy()
            .ends_with(&format!("realesrgan-ncnn-vulkan{}", EXE_SUFFIX)));
    }

    #[test]
    fn all_present_when_every_tool_exists() {
        let tools = FakeTools::install();

        let report = probe_tools(tools.bin_dir(), Some(tools.ffmpeg()));
        assert!(report.all_present());
        assert!(report.missing().is_empty());
        assert_eq!(report.status_lines().len(), 3);

        let set = report.into_tool_set().unwrap();
        assert_eq!(set.get(ToolKind::Ffmpeg).path, tools.ffmpeg());
    }

    #[test]
    fn any_missing_tool_fails() {
        for absent in ToolKind::ALL {
            let tools = FakeTools::install();
            tools.remove(absent);

            let report = probe_tools(tools.bin_dir(), Some(tools.ffmpeg()));
            assert!(!report.all_present(), "{absent} removed but probe passed");

            let missing = report.missing();
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].kind, absent);

            match report.into_tool_set() {
                Err(ToolError::Missing(list)) => assert_eq!(list[0].kind, absent),
                other => panic!("expected Missing, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_bin_dir_reports_both_ncnn_tools() {
        let dir = tempdir().unwrap();
        let report = probe_tools(dir.path(), Some(&dir.path().join("no-ffmpeg")));

        assert_eq!(report.missing().len(), 3);
        assert!(report.status_lines()[0].starts_with("[MISSING] RIFE"));
    }
}
