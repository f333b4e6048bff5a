// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Scripted process runner for tests
//!
//! Records every invocation and answers from a list of canned replies keyed
//! on a substring of the command line. Unmatched invocations exit 0 silently.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{CancelToken, Invocation, ProcessOutput, ProcessRunner};
use crate::errors::FreezeError;

enum Reply {
    Output(ProcessOutput),
    LaunchFailure,
    Cancelled,
}

#[derive(Default)]
pub(crate) struct ScriptedRunner {
    replies: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer invocations whose command line contains `needle`
    pub(crate) fn respond(self, needle: &str, code: i32, lines: &[&str]) -> Self {
        let output = ProcessOutput::exited(code, lines.iter().map(|l| l.to_string()).collect());
        self.replies
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Output(output)));
        self
    }

    /// Fail invocations whose command line contains `needle` as if the
    /// program did not exist
    pub(crate) fn fail_launch(self, needle: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::LaunchFailure));
        self
    }

    /// Behave as if cancellation fired while `needle` was running
    pub(crate) fn cancel_on(self, needle: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push((needle.to_string(), Reply::Cancelled));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, FreezeError> {
        if cancel.is_cancelled() {
            return Err(FreezeError::Cancelled);
        }

        self.calls.lock().unwrap().push(invocation.clone());
        let line = invocation.command_line();

        let replies = self.replies.lock().unwrap();
        match replies.iter().find(|(needle, _)| line.contains(needle.as_str())) {
            Some((_, Reply::Output(output))) => Ok(output.clone()),
            Some((_, Reply::LaunchFailure)) => {
                let io = std::io::Error::new(std::io::ErrorKind::NotFound, "program not found");
                Err(FreezeError::launch(&invocation.program, &io))
            }
            Some((_, Reply::Cancelled)) => Err(FreezeError::Cancelled),
            None => Ok(ProcessOutput::exited(0, Vec::new())),
        }
    }
}
