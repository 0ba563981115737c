//! Tester execution engine.
//!
//! Every invocation runs under a hard timeout and always yields a
//! [`RawResult`]; spawn failures, non-zero exits and timeouts become
//! [`RawResult::Failed`] so one broken case never aborts a run. There is no
//! retry.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

/// Maximum stderr characters kept in a non-zero-exit sentinel.
const STDERR_LIMIT: usize = 200;

/// Why a tester invocation produced no usable output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    #[error("Command timed out after {}", format_timeout(.timeout))]
    Timeout { timeout: Duration },

    #[error("{}, Stderr: {}", exit_label(.code), stderr_label(.stderr))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("{0}")]
    Spawn(String),
}

impl InvocationError {
    /// Display text used in artifacts, e.g. `[ERROR: Exit code 1, Stderr: N/A]`.
    #[must_use]
    pub fn sentinel(&self) -> String {
        format!("[ERROR: {self}]")
    }
}

fn format_timeout(timeout: &Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("Exit code {code}"),
        None => "Terminated by signal".to_string(),
    }
}

fn stderr_label(stderr: &str) -> &str {
    if stderr.is_empty() { "N/A" } else { stderr }
}

/// Output of one tester invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResult {
    /// Stdout of a zero exit, trailing whitespace trimmed (may be empty)
    Output(Vec<u8>),
    /// Error sentinel
    Failed(InvocationError),
}

impl RawResult {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

fn trim_trailing_whitespace(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.last().is_some_and(u8::is_ascii_whitespace) {
        bytes.pop();
    }
    bytes
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Shell-like rendering of a command line for diagnostics.
#[must_use]
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs tester executables under a fixed timeout.
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
    debug: bool,
}

impl Executor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            debug: false,
        }
    }

    /// Echo each command line and its stderr to the diagnostic stream.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn invoke(&self, program: &Path, args: &[String]) -> RawResult {
        if self.debug {
            info!(command = %render_command(program, args), "Running tester");
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                debug!(program = %program.display(), "Tester timed out");
                return RawResult::Failed(InvocationError::Timeout {
                    timeout: self.timeout,
                });
            }
            Ok(Err(err)) => {
                debug!(program = %program.display(), error = %err, "Tester failed to spawn");
                return RawResult::Failed(InvocationError::Spawn(err.to_string()));
            }
            Ok(Ok(output)) => output,
        };

        let stderr = truncate_stderr(&output.stderr);
        if self.debug && !stderr.is_empty() {
            info!(stderr = %stderr, "Tester stderr");
        }

        if !output.status.success() {
            return RawResult::Failed(InvocationError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        RawResult::Output(trim_trailing_whitespace(output.stdout))
    }
}
