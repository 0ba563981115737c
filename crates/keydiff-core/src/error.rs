//! Error types for keydiff-core
//!
//! Only fatal, run-level failures live here. Per-invocation failures of a
//! tester executable are values ([`crate::exec::InvocationError`]) carried
//! inside a [`crate::exec::RawResult`], never an `Err`.

use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Remediation command for resolving an error
#[derive(Debug, Clone)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Add a command
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for keydiff-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A tester executable is absent; checked once before any case runs
    #[error("Tester executable for '{target}' not found at {}", path.display())]
    MissingExecutable { target: String, path: PathBuf },

    /// `--target` named something that is not registered
    #[error("Unknown target '{0}'")]
    UnknownTarget(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Config(err) => Some(err.remediation()),
            Self::MissingExecutable { path, .. } => Some(
                Remediation::new("Build the tester executables before running the harness.")
                    .command("Build testers", "make")
                    .command("Check path", format!("ls -l {}", path.display()))
                    .alternative("Point [testers] in the config file at an existing build."),
            ),
            Self::UnknownTarget(_) => Some(
                Remediation::new("Pick one of the registered targets.")
                    .command("List targets", "keydiff --list-targets")
                    .alternative("Declare a custom target with a [[targets]] table."),
            ),
            Self::Io(_) => Some(
                Remediation::new("Check filesystem permissions for the output files, then retry.")
                    .alternative("Use --results-file / --mismatch-log to write elsewhere."),
            ),
            Self::Json(_) => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Invalid config value: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => {
                Remediation::new(format!("Create the config file or drop --config: {path}"))
                    .alternative("Run without a config file to use the built-in defaults.")
            }
            Self::ReadFailed(path, _) => {
                Remediation::new(format!("Check that {path} is readable."))
                    .command("Inspect", format!("ls -l {path}"))
            }
            Self::ParseFailed(_) => Remediation::new("Fix the TOML syntax in the config file.")
                .alternative("Start from an empty file; every field has a default."),
            Self::ValidationError(_) => {
                Remediation::new("Correct the reported value in the config file.")
            }
        }
    }
}
