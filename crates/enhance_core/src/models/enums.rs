//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single enhancement run.
///
/// ```text
/// Init → DependencyCheck → Extracting → [Interpolating] → [Upscaling] → Encoding → Done
/// ```
///
/// `Failed` and `Interrupted` are reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Init,
    DependencyCheck,
    Extracting,
    Interpolating,
    Upscaling,
    Encoding,
    Done,
    Failed,
    Interrupted,
}

impl PipelineStage {
    /// Whether the run has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Done | PipelineStage::Failed | PipelineStage::Interrupted
        )
    }

    /// Position in the forward sequence, `None` for the abort states.
    fn ordinal(&self) -> Option<u8> {
        match self {
            PipelineStage::Init => Some(0),
            PipelineStage::DependencyCheck => Some(1),
            PipelineStage::Extracting => Some(2),
            PipelineStage::Interpolating => Some(3),
            PipelineStage::Upscaling => Some(4),
            PipelineStage::Encoding => Some(5),
            PipelineStage::Done => Some(6),
            PipelineStage::Failed | PipelineStage::Interrupted => None,
        }
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    ///
    /// Forward moves may skip the optional interpolation and upscaling
    /// states but nothing else. Abort states are reachable from any
    /// non-terminal state.
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            PipelineStage::Failed | PipelineStage::Interrupted => true,
            PipelineStage::Init => false,
            _ => {
                let (Some(from), Some(to)) = (self.ordinal(), next.ordinal()) else {
                    return false;
                };
                if to <= from {
                    return false;
                }
                // Only Interpolating (3) and Upscaling (4) may be jumped over.
                (from + 1..to).all(|skipped| skipped == 3 || skipped == 4)
            }
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Init => write!(f, "Init"),
            PipelineStage::DependencyCheck => write!(f, "DependencyCheck"),
            PipelineStage::Extracting => write!(f, "Extracting"),
            PipelineStage::Interpolating => write!(f, "Interpolating"),
            PipelineStage::Upscaling => write!(f, "Upscaling"),
            PipelineStage::Encoding => write!(f, "Encoding"),
            PipelineStage::Done => write!(f, "Done"),
            PipelineStage::Failed => write!(f, "Failed"),
            PipelineStage::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// External program the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Neural frame interpolator (rife-ncnn-vulkan).
    Rife,
    /// Neural upscaler (realesrgan-ncnn-vulkan).
    RealEsrgan,
    /// Frame/video codec tool.
    Ffmpeg,
}

impl ToolKind {
    /// All tools, in probe order.
    pub const ALL: [ToolKind; 3] = [ToolKind::Rife, ToolKind::RealEsrgan, ToolKind::Ffmpeg];

    /// Executable base name (without platform suffix).
    pub fn executable_name(&self) -> &'static str {
        match self {
            ToolKind::Rife => "rife-ncnn-vulkan",
            ToolKind::RealEsrgan => "realesrgan-ncnn-vulkan",
            ToolKind::Ffmpeg => "ffmpeg",
        }
    }

    /// What to tell the user when the tool cannot be found.
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            ToolKind::Rife | ToolKind::RealEsrgan => {
                "Download the ncnn-vulkan release into the bin directory (see --bin-dir)"
            }
            ToolKind::Ffmpeg => {
                "Install FFmpeg (winget install ffmpeg, brew install ffmpeg or apt install ffmpeg)"
            }
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Rife => write!(f, "RIFE"),
            ToolKind::RealEsrgan => write!(f, "Real-ESRGAN"),
            ToolKind::Ffmpeg => write!(f, "FFmpeg"),
        }
    }
}
