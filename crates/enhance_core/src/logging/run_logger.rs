//! Log for a single enhancement run.
//!
//! Lines go to `<logs_folder>/<run_name>.log` and, when a callback is
//! given, to the console. Raw tool output is kept in a bounded tail so a
//! failing stage can be reported with the last lines its tool printed.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel};

/// Run log shared by every step of one run.
pub struct RunLogger {
    log_path: PathBuf,
    config: LogConfig,
    file: Mutex<BufWriter<File>>,
    console: Option<LogCallback>,
    tail: Mutex<VecDeque<String>>,
}

impl RunLogger {
    /// Create `<log_dir>/<run_name>.log`, truncating an earlier log of
    /// the same name.
    pub fn new(
        run_name: &str,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        console: Option<LogCallback>,
    ) -> io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", file_safe(run_name)));
        let file = BufWriter::new(File::create(&log_path)?);
        let tail = VecDeque::with_capacity(config.error_tail);

        Ok(Self {
            log_path,
            config,
            file: Mutex::new(file),
            console,
            tail: Mutex::new(tail),
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, &format!("[WARNING] {}", message));
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, &format!("[ERROR] {}", message));
    }

    /// Command line of a tool about to run.
    pub fn command(&self, command_line: &str) {
        self.emit(LogLevel::Info, &format!("$ {}", command_line));
    }

    /// Start of a pipeline step.
    pub fn phase(&self, title: &str) {
        self.emit(LogLevel::Info, &format!("=== {} ===", title));
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, &format!("[SUCCESS] {}", message));
    }

    /// Result of a dependency or output check.
    pub fn validation(&self, message: &str) {
        self.emit(LogLevel::Info, &format!("[Validation] {}", message));
    }

    /// Completion of a stage or step, with the frames it produced when
    /// there are any.
    pub fn finished(&self, what: &str, frames: Option<u32>, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        let message = match frames {
            Some(count) => format!("{}: {} frames in {:.1}s", what, count, secs),
            None => format!("{} finished in {:.1}s", what, secs),
        };
        self.success(&message);
    }

    /// Record one captured stream of tool output.
    ///
    /// Blank lines are dropped. Every other line enters the tail; outside
    /// compact mode it is also logged at debug level.
    pub fn tool_output(&self, text: &str, is_stderr: bool) {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return;
        }

        if self.config.error_tail > 0 {
            let mut tail = self.tail.lock();
            for line in &lines {
                if tail.len() == self.config.error_tail {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }
        let stream = if is_stderr { "stderr" } else { "stdout" };
        for line in lines {
            self.emit(LogLevel::Debug, &format!("[{}] {}", stream, line));
        }
    }

    /// Replay the tool output tail after `step` failed.
    ///
    /// Written regardless of level, since it is the only record of the
    /// tool's output in compact mode.
    pub fn show_tail(&self, step: &str) {
        let tail = self.tail.lock();
        if tail.is_empty() {
            return;
        }

        self.write_line(&format!(
            "--- last {} lines of tool output before '{}' failed ---",
            tail.len(),
            step
        ));
        for line in tail.iter() {
            self.write_line(&format!("  | {}", line));
        }
    }

    pub fn flush(&self) {
        let _ = self.file.lock().flush();
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if level >= self.config.level {
            self.write_line(message);
        }
    }

    fn write_line(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        let _ = writeln!(self.file.lock(), "{}", line);
        if let Some(console) = &self.console {
            console(&line);
        }
    }
}

/// Replace characters that are not allowed in file names.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn read_log(logger: &RunLogger) -> String {
        logger.flush();
        fs::read_to_string(logger.log_path()).unwrap()
    }

    fn quiet() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn writes_markers_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("clip_run", dir.path(), quiet(), None).unwrap();

        logger.phase("[2/5] Extracting frames");
        logger.command("ffmpeg -i clip.mp4 -r 30 frame_%06d.png");
        logger.validation("FFmpeg: /usr/bin/ffmpeg");

        assert!(logger.log_path().ends_with("clip_run.log"));
        let log = read_log(&logger);
        assert!(log.contains("=== [2/5] Extracting frames ==="));
        assert!(log.contains("$ ffmpeg -i clip.mp4"));
        assert!(log.contains("[Validation] FFmpeg: /usr/bin/ffmpeg"));
    }

    #[test]
    fn stage_completion_reports_frames_and_time() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("clip_run", dir.path(), quiet(), None).unwrap();

        logger.finished("Extract", Some(312), Duration::from_millis(4_200));
        logger.finished("Pipeline", None, Duration::from_secs(61));

        let log = read_log(&logger);
        assert!(log.contains("[SUCCESS] Extract: 312 frames in 4.2s"));
        assert!(log.contains("[SUCCESS] Pipeline finished in 61.0s"));
    }

    #[test]
    fn level_filters_console_lines() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let console: LogCallback = Box::new(move |_line| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let logger = RunLogger::new("clip_run", dir.path(), quiet(), Some(console)).unwrap();
        logger.info("Input: clip.mp4");
        logger.debug("filtered at info level");
        logger.error("FFmpeg failed");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_replays_only_the_newest_tool_lines() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..quiet()
        };
        let logger = RunLogger::new("clip_run", dir.path(), config, None).unwrap();

        logger.tool_output("frame=1\nframe=2\n\nframe=3\n", true);
        logger.tool_output("frame=4\n", false);
        assert!(!read_log(&logger).contains("frame="));

        logger.show_tail("Extract");
        let log = read_log(&logger);
        assert!(log.contains("last 3 lines of tool output before 'Extract' failed"));
        assert!(!log.contains("| frame=1"));
        assert!(log.contains("| frame=2"));
        assert!(log.contains("| frame=4"));
    }

    #[test]
    fn verbose_mode_logs_tool_streams() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            show_timestamps: false,
            ..LogConfig::debug()
        };
        let logger = RunLogger::new("clip_run", dir.path(), config, None).unwrap();

        logger.tool_output("Stream #0:0: Video: h264\n", true);
        logger.tool_output("done\n", false);

        let log = read_log(&logger);
        assert!(log.contains("[stderr] Stream #0:0: Video: h264"));
        assert!(log.contains("[stdout] done"));
    }

    #[test]
    fn empty_tail_writes_nothing() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("clip_run", dir.path(), quiet(), None).unwrap();

        logger.show_tail("Encode");
        assert!(read_log(&logger).is_empty());
    }

    #[test]
    fn run_names_become_safe_file_names() {
        assert_eq!(file_safe("clip_3f2a"), "clip_3f2a");
        assert_eq!(file_safe("has/slash"), "has_slash");
        assert_eq!(file_safe("a<b>c:d"), "a_b_c_d");
    }
}
