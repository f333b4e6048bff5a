// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Error types
//!
//! Every component reports through [`FreezeError`]. The process runner and
//! the workspace stager surface their errors unrecovered; the orchestrator
//! wraps them with the failing stage name and hands them to the caller.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for freezerun operations
pub type FreezeResult<T> = Result<T, FreezeError>;

/// Main error type for freezerun
#[derive(Error, Debug, Diagnostic)]
pub enum FreezeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to launch '{program}': {error}")]
    #[diagnostic(code(freezerun::launch))]
    Launch {
        program: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("'{program}' exited with {}", exit_label(*code))]
    #[diagnostic(code(freezerun::non_zero_exit))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        /// Last few captured output lines, newline separated
        tail: String,
        #[help]
        help: Option<String>,
    },

    #[error("Operation was cancelled")]
    #[diagnostic(code(freezerun::cancelled))]
    Cancelled,

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' failed: {source}")]
    #[diagnostic(code(freezerun::stage_failed))]
    Stage {
        stage: String,
        #[source]
        source: Box<FreezeError>,
    },

    #[error("Staging failed: {message}")]
    #[diagnostic(code(freezerun::staging))]
    Staging {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Not found: {path}")]
    #[diagnostic(code(freezerun::not_found))]
    NotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(freezerun::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Environment variable '{name}' is not set")]
    #[diagnostic(
        code(freezerun::missing_env),
        help("Export {name} before running this command")
    )]
    MissingEnv { name: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(freezerun::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(freezerun::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(freezerun::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(freezerun::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(freezerun::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(freezerun::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(freezerun::glob_error))]
    GlobPattern { message: String },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl From<std::io::Error> for FreezeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FreezeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FreezeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FreezeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for FreezeError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl FreezeError {
    /// Create a launch error, with an install hint for the tools we know about
    pub fn launch(program: &str, error: &std::io::Error) -> Self {
        let help = match error.kind() {
            std::io::ErrorKind::NotFound => {
                Some(RecoverySuggestion::install_tool(program).to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                Some(format!("'{}' exists but is not executable", program))
            }
            _ => None,
        };

        Self::Launch {
            program: program.to_string(),
            error: error.to_string(),
            help,
        }
    }

    /// Create a non-zero exit error from the captured output of a process
    pub fn non_zero_exit(program: &str, code: Option<i32>, lines: &[String]) -> Self {
        let start = lines.len().saturating_sub(10);
        let tail = lines[start..].join("\n");
        let help = if tail.is_empty() {
            None
        } else {
            Some(format!("Last output:\n{}", tail))
        };

        Self::NonZeroExit {
            program: program.to_string(),
            code,
            tail,
            help,
        }
    }

    /// Create a staging error without a hint
    pub fn staging(message: impl Into<String>) -> Self {
        Self::Staging {
            message: message.into(),
            help: None,
        }
    }

    /// Wrap this error with the name of the stage that produced it
    pub fn in_stage(self, stage: &str) -> Self {
        match self {
            // Already attributed; keep the innermost stage name.
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage: stage.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any stage wrapping removed
    pub fn root(&self) -> &FreezeError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}
