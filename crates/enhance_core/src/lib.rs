//! Enhance Core - backend logic for the video enhancer.
//!
//! This crate drives a strictly sequential frame pipeline around three
//! external programs (FFmpeg, RIFE and Real-ESRGAN). It has no UI
//! dependencies and is used by the `video-enhancer` binary.

pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
