// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! External process execution
//!
//! Every external call the build makes (git, the interpreter, the freeze
//! tool, the release CLI) goes through a [`ProcessRunner`]. The production
//! implementation is [`TokioProcessRunner`]; tests swap in a scripted fake.

mod cancel;
#[cfg(test)]
pub(crate) mod fake;
mod runner;

pub use cancel::CancelToken;
pub use runner::TokioProcessRunner;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{FreezeError, FreezeResult};

/// One external command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Executable name or path
    pub program: String,

    /// Arguments, passed verbatim (no shell)
    pub args: Vec<String>,

    /// Working directory (inherits ours when unset)
    pub working_dir: Option<PathBuf>,

    /// Environment overlay applied to the child only
    pub env: BTreeMap<String, String>,

    /// Suspend until the process exits
    pub wait_for_exit: bool,

    /// Forward each output line to the log
    pub log_output: bool,
}

impl Invocation {
    /// Create an invocation that waits for exit and logs its output
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            wait_for_exit: true,
            log_output: true,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Return right after launch instead of waiting for exit
    pub fn detached(mut self) -> Self {
        self.wait_for_exit = false;
        self
    }

    /// Capture output without logging it
    pub fn quiet(mut self) -> Self {
        self.log_output = false;
        self
    }

    /// Human readable command line, for logs and plans
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "code")]
pub enum ExitState {
    /// Exited normally with a status code
    Exited(i32),
    /// Terminated without a status code (e.g. by a signal)
    Signalled,
    /// Not waited for
    Detached,
}

/// Captured result of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Output lines from stdout and stderr, in arrival order
    pub lines: Vec<String>,
    pub state: ExitState,
}

impl ProcessOutput {
    pub fn exited(code: i32, lines: Vec<String>) -> Self {
        Self {
            lines,
            state: ExitState::Exited(code),
        }
    }

    pub fn detached() -> Self {
        Self {
            lines: Vec::new(),
            state: ExitState::Detached,
        }
    }

    /// Exit code, if the process exited normally
    pub fn code(&self) -> Option<i32> {
        match self.state {
            ExitState::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.state, ExitState::Exited(0))
    }

    /// Turn a failed exit into a [`FreezeError::NonZeroExit`].
    ///
    /// Detached processes are never checked.
    pub fn ensure_success(self, program: &str) -> FreezeResult<Self> {
        match self.state {
            ExitState::Exited(0) | ExitState::Detached => Ok(self),
            _ => Err(FreezeError::non_zero_exit(program, self.code(), &self.lines)),
        }
    }
}

/// Trait for launching external programs
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run an invocation.
    ///
    /// Fails with [`FreezeError::Launch`] when the program cannot be started
    /// and [`FreezeError::Cancelled`] when `cancel` fires first. A non-zero
    /// exit is not an error here; callers decide via
    /// [`ProcessOutput::ensure_success`].
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, FreezeError>;
}
