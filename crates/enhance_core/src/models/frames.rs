//! Frame sequence naming and validation.
//!
//! Every stage reads and writes frames named `000001.png`, `000002.png`, ...
//! The external tools only report an exit code, so the directory is
//! inspected after each stage before the next one may consume it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// File extension of every frame image.
pub const FRAME_EXTENSION: &str = "png";

/// Zero-padded width of the frame number.
const FRAME_DIGITS: usize = 6;

/// Errors found while inspecting a frame directory.
#[derive(Error, Debug)]
pub enum FrameSequenceError {
    #[error("Cannot read frame directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No frames found in {0}")]
    Empty(PathBuf),

    #[error("Frame sequence in {dir} is not contiguous: expected frame {expected}, found {found}")]
    Gap {
        dir: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Unexpected frame file name '{name}' in {dir} (expected %06d numbering)")]
    UnexpectedName { dir: PathBuf, name: String },
}

/// A validated, contiguous frame sequence on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    /// Directory holding the frames.
    pub dir: PathBuf,
    /// Number of frames (also the number of the last frame).
    pub count: u32,
}

impl FrameSequence {
    /// Path of the first frame.
    pub fn first_frame(&self) -> PathBuf {
        self.dir.join(frame_file_name(1))
    }

    /// Path of the last frame.
    pub fn last_frame(&self) -> PathBuf {
        self.dir.join(frame_file_name(self.count))
    }
}

/// File name for frame number `index` (1-based).
pub fn frame_file_name(index: u32) -> String {
    format!("{:0width$}.{}", index, FRAME_EXTENSION, width = FRAME_DIGITS)
}

/// printf-style file name pattern understood by FFmpeg and RIFE.
pub fn frame_pattern_name() -> String {
    format!("%0{}d.{}", FRAME_DIGITS, FRAME_EXTENSION)
}

/// Full pattern path for frames in `dir`.
pub fn frame_pattern(dir: &Path) -> PathBuf {
    dir.join(frame_pattern_name())
}

/// Frame number encoded in a file stem.
///
/// `%06d` pads to six digits and grows past them from frame 1,000,000 on,
/// so longer stems are accepted only without a leading zero.
fn frame_number(stem: &str) -> Option<u32> {
    let digits = stem.len() >= FRAME_DIGITS && stem.bytes().all(|b| b.is_ascii_digit());
    let padded = stem.len() == FRAME_DIGITS || !stem.starts_with('0');
    if digits && padded {
        stem.parse().ok()
    } else {
        None
    }
}

/// Inspect a directory and validate that it holds a contiguous sequence
/// `000001.png ..= N.png` with `N > 0`.
///
/// Files with other extensions are ignored (tools sometimes leave logs
/// behind). A `.png` that does not follow the numbering is an error.
pub fn inspect_frames(dir: &Path) -> Result<FrameSequence, FrameSequenceError> {
    let entries = fs::read_dir(dir).map_err(|source| FrameSequenceError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut numbers: Vec<u32> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| FrameSequenceError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        let is_frame_ext = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(FRAME_EXTENSION))
            .unwrap_or(false);
        if !is_frame_ext || !path.is_file() {
            continue;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        match frame_number(&stem) {
            Some(n) => numbers.push(n),
            None => {
                return Err(FrameSequenceError::UnexpectedName {
                    dir: dir.to_path_buf(),
                    name: entry.file_name().to_string_lossy().to_string(),
                })
            }
        }
    }

    if numbers.is_empty() {
        return Err(FrameSequenceError::Empty(dir.to_path_buf()));
    }

    numbers.sort_unstable();
    for (i, found) in numbers.iter().enumerate() {
        let expected = i as u32 + 1;
        if *found != expected {
            return Err(FrameSequenceError::Gap {
                dir: dir.to_path_buf(),
                expected,
                found: *found,
            });
        }
    }

    Ok(FrameSequence {
        dir: dir.to_path_buf(),
        count: numbers.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(frame_file_name(1), "000001.png");
        assert_eq!(frame_file_name(123456), "123456.png");
        assert!(frame_pattern(Path::new("/tmp/x"))
            .to_string_lossy()
            .ends_with("%06d.png"));
    }

    #[test]
    fn accepts_contiguous_sequence() {
        let dir = tempdir().unwrap();
        for i in 1..=5 {
            touch(dir.path(), &frame_file_name(i));
        }
        touch(dir.path(), "ffmpeg.log");

        let seq = inspect_frames(dir.path()).unwrap();
        assert_eq!(seq.count, 5);
        assert!(seq.last_frame().ends_with("000005.png"));
    }

    #[test]
    fn rejects_empty_directory() {
        let dir = tempdir().unwrap();
        let err = inspect_frames(dir.path()).unwrap_err();
        assert!(matches!(err, FrameSequenceError::Empty(_)));
    }

    #[test]
    fn rejects_gap() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "000001.png");
        touch(dir.path(), "000002.png");
        touch(dir.path(), "000004.png");

        match inspect_frames(dir.path()).unwrap_err() {
            FrameSequenceError::Gap { expected, found, .. } => {
                assert_eq!(expected, 3);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_sequence_not_starting_at_one() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "000002.png");

        assert!(matches!(
            inspect_frames(dir.path()).unwrap_err(),
            FrameSequenceError::Gap { expected: 1, .. }
        ));
    }

    #[test]
    fn rejects_foreign_naming() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "00000001.png");

        assert!(matches!(
            inspect_frames(dir.path()).unwrap_err(),
            FrameSequenceError::UnexpectedName { .. }
        ));
    }

    #[test]
    fn numbering_grows_past_six_digits() {
        assert_eq!(frame_file_name(1_000_000), "1000000.png");
        assert_eq!(frame_number("000042"), Some(42));
        assert_eq!(frame_number("1000000"), Some(1_000_000));
        assert_eq!(frame_number("12345"), None);
        assert_eq!(frame_number("0000042"), None);
        assert_eq!(frame_number("00004a"), None);
    }

    #[test]
    fn seven_digit_frame_is_part_of_the_sequence() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "000001.png");
        touch(dir.path(), "1000000.png");

        // Accepted as frame 1,000,000, so the error is the gap after 1.
        match inspect_frames(dir.path()).unwrap_err() {
            FrameSequenceError::Gap { expected, found, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1_000_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_directory_is_unreadable() {
        let dir = tempdir().unwrap();
        let err = inspect_frames(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FrameSequenceError::Unreadable { .. }));
    }
}
