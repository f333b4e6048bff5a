// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Tokio-backed process runner

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CancelToken, ExitState, Invocation, ProcessOutput, ProcessRunner};
use crate::errors::FreezeError;

/// How long to keep draining output after killing a cancelled process
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Which pipe a line came from
#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs invocations as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(invocation.wait_for_exit);

        if let Some(ref dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }

    /// Spawn one drain task per pipe; both feed the same channel.
    fn drain(child: &mut Child) -> mpsc::UnboundedReceiver<(Stream, String)> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, Stream::Stderr, tx));
        }

        rx
    }
}

async fn forward_lines<R>(
    pipe: R,
    stream: Stream,
    tx: mpsc::UnboundedSender<(Stream, String)>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send((stream, line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(?stream, error = %e, "stopped reading process output");
                break;
            }
        }
    }
}

fn log_line(invocation: &Invocation, stream: Stream, line: &str) {
    if !invocation.log_output || line.is_empty() {
        return;
    }
    match stream {
        Stream::Stdout => info!(program = %invocation.program, "{}", line),
        Stream::Stderr => info!(program = %invocation.program, stream = "stderr", "{}", line),
    }
}

/// Every line is recorded; empty ones are only kept out of the log.
fn record(invocation: &Invocation, lines: &mut Vec<String>, stream: Stream, line: String) {
    log_line(invocation, stream, &line);
    lines.push(line);
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, FreezeError> {
        if cancel.is_cancelled() {
            return Err(FreezeError::Cancelled);
        }

        if invocation.log_output {
            info!(
                command = %invocation.command_line(),
                dir = ?invocation.working_dir,
                wait = invocation.wait_for_exit,
                "starting process"
            );
        }

        let mut child = Self::command(invocation)
            .spawn()
            .map_err(|e| FreezeError::launch(&invocation.program, &e))?;

        let mut rx = Self::drain(&mut child);

        if !invocation.wait_for_exit {
            let detached = invocation.clone();
            tokio::spawn(async move {
                while let Some((stream, line)) = rx.recv().await {
                    log_line(&detached, stream, &line);
                }
                match child.wait().await {
                    Ok(status) => {
                        debug!(program = %detached.program, %status, "detached process ended")
                    }
                    Err(e) => warn!(
                        program = %detached.program,
                        error = %e,
                        "failed to reap detached process"
                    ),
                }
            });
            return Ok(ProcessOutput::detached());
        }

        let mut lines = Vec::new();
        let mut pipes_open = true;
        let mut exit = None;

        while pipes_open || exit.is_none() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(program = %invocation.program, "cancellation requested; killing process");
                    if let Err(e) = child.kill().await {
                        warn!(program = %invocation.program, error = %e, "failed to kill process");
                    }
                    // Let the drains finish now that the pipes are closing. A
                    // grandchild can keep a pipe open, so this is bounded.
                    let drained = tokio::time::timeout(DRAIN_GRACE, async {
                        while let Some((stream, line)) = rx.recv().await {
                            record(invocation, &mut lines, stream, line);
                        }
                    })
                    .await;
                    if drained.is_err() {
                        warn!(
                            program = %invocation.program,
                            "output still open after kill; abandoning drain"
                        );
                    }
                    return Err(FreezeError::Cancelled);
                }

                line = rx.recv(), if pipes_open => match line {
                    Some((stream, line)) => record(invocation, &mut lines, stream, line),
                    None => pipes_open = false,
                },

                status = child.wait(), if exit.is_none() => {
                    let status = status.map_err(|e| FreezeError::Io {
                        message: format!("waiting for '{}': {}", invocation.program, e),
                    })?;
                    exit = Some(status);
                }
            }
        }

        let state = match exit.and_then(|status| status.code()) {
            Some(code) => ExitState::Exited(code),
            None => ExitState::Signalled,
        };

        if invocation.log_output {
            debug!(program = %invocation.program, ?state, lines = lines.len(), "process ended");
        }

        Ok(ProcessOutput { lines, state })
    }
}
