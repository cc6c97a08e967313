//! Blocking runner for a single external tool invocation.
//!
//! stdout/stderr go to capture files instead of pipes so a chatty tool
//! can never stall on a full pipe while we poll it. The child is polled
//! every 100ms; it is killed when the timeout expires or the abort
//! check returns true.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::models::ToolKind;

use super::types::{ToolError, ToolResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A fully specified command line for one tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    kind: ToolKind,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Create a command for `kind` using the resolved executable path.
    pub fn new(kind: ToolKind, program: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments as lossy strings (for logs and tests).
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    /// Shell-like rendering for the job log.
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program.to_string_lossy())];
        parts.extend(self.arg_strings().iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) {
        format!("\"{}\"", part)
    } else {
        part.to_string()
    }
}

/// Limits applied while waiting for a tool.
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    /// Kill the tool after this long (`None` = wait indefinitely).
    pub timeout: Option<Duration>,
}

/// Captured result of a successful invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// Run `cmd` to completion.
///
/// # Arguments
/// * `cmd` - Command to run
/// * `capture_dir` - Directory receiving `<label>.stdout.log` / `<label>.stderr.log`
/// * `label` - Capture file prefix (usually the stage name)
/// * `limits` - Timeout settings
/// * `should_abort` - Polled while the tool runs; `true` kills it
///
/// # Returns
/// The captured output on exit code 0. A non-zero exit becomes
/// `ToolError::CommandFailed` carrying the tool's stderr verbatim
/// (stdout when stderr is empty).
pub fn run_tool(
    cmd: &ToolCommand,
    capture_dir: &Path,
    label: &str,
    limits: &RunLimits,
    should_abort: &dyn Fn() -> bool,
) -> ToolResult<ToolOutput> {
    let tool = cmd.kind;
    let stdout_path = capture_dir.join(format!("{}.stdout.log", label));
    let stderr_path = capture_dir.join(format!("{}.stderr.log", label));

    let stdout_file = File::create(&stdout_path).map_err(|source| ToolError::Io {
        operation: format!("create {}", stdout_path.display()),
        source,
    })?;
    let stderr_file = File::create(&stderr_path).map_err(|source| ToolError::Io {
        operation: format!("create {}", stderr_path.display()),
        source,
    })?;

    tracing::debug!("Running: {}", cmd.display());

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|source| ToolError::SpawnFailed { tool, source })?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if should_abort() {
                    terminate(&mut child);
                    tracing::warn!(
                        "{} interrupted after {:.1}s",
                        tool,
                        started.elapsed().as_secs_f64()
                    );
                    return Err(ToolError::Cancelled { tool });
                }
                if let Some(timeout) = limits.timeout {
                    if started.elapsed() > timeout {
                        terminate(&mut child);
                        return Err(ToolError::TimedOut {
                            tool,
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                terminate(&mut child);
                return Err(ToolError::Io {
                    operation: format!("wait for {}", tool),
                    source,
                });
            }
        }
    };

    let elapsed = started.elapsed();
    let stdout = read_capture(&stdout_path)?;
    let stderr = read_capture(&stderr_path)?;
    let exit_code = status.code().unwrap_or(-1);

    if killed_by_interrupt(&status) {
        tracing::warn!("{} exited on SIGINT", tool);
        return Err(ToolError::Cancelled { tool });
    }

    if !status.success() {
        let message = if stderr.trim().is_empty() {
            stdout.clone()
        } else {
            stderr.clone()
        };
        return Err(ToolError::CommandFailed {
            tool,
            exit_code,
            message,
        });
    }

    tracing::info!("{} finished in {:.1}s", tool, elapsed.as_secs_f64());

    Ok(ToolOutput {
        stdout,
        stderr,
        exit_code,
        elapsed,
    })
}

#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
    false
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn read_capture(path: &Path) -> ToolResult<String> {
    let bytes = fs::read(path).map_err(|source| ToolError::Io {
        operation: format!("read {}", path.display()),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}
