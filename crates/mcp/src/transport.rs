//! Stdio transport: one long-lived child process speaking newline-delimited
//! JSON over stdin/stdout.
//!
//! Framing is strictly one line per message and the transport does not
//! correlate responses by id itself: the next line read is taken to be the
//! answer to the request just written. Calls are therefore serialized by a
//! mutex held across write+read. A timed-out call, or an answer the session
//! could not match to its request, kills the child so a late or stray line
//! can never be attributed to the next request.
//!
//! Waiting for the mutex counts against the caller's timeout.

use std::{collections::HashMap, process::Stdio, time::Duration};

use {
    async_trait::async_trait,
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        process::{Child, ChildStdin, ChildStdout, Command},
        sync::Mutex,
        time::Instant,
    },
    tracing::{debug, info, warn},
};

use crate::{
    codec,
    error::{Context, Error, Result, TransportError},
    traits::McpTransport,
    types::JsonRpcRequest,
};

/// Stdio-based transport for a tool server process.
pub struct StdioTransport {
    command: String,
    process: Mutex<ProcessSlot>,
}

enum ProcessSlot {
    Running(StdioProcess),
    /// Killed by the transport; holds the reason reported to later calls.
    Killed(String),
    Closed,
}

impl ProcessSlot {
    /// Move a running process out, leaving `Killed(reason)` behind.
    fn kill_with(&mut self, reason: String) -> Option<StdioProcess> {
        if !matches!(self, Self::Running(_)) {
            return None;
        }
        match std::mem::replace(self, Self::Killed(reason)) {
            Self::Running(process) => Some(process),
            _ => None,
        }
    }
}

struct StdioProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    /// Spawn the server process. Failure to start is a connection error.
    pub fn spawn(command: &str, args: &[String], env: &HashMap<String, String>) -> Result<Self> {
        info!(command = %command, args = ?args, "spawning tool server process");

        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::connection(format!("failed to spawn '{command}': {e}")))?;

        let stdin = child.stdin.take().context("failed to capture stdin")?;
        let stdout = child.stdout.take().context("failed to capture stdout")?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        warn!(stderr = %trimmed, "tool server stderr");
                    }
                }
            });
        }

        debug!(pid = ?child.id(), "tool server process started");

        Ok(Self {
            command: command.to_string(),
            process: Mutex::new(ProcessSlot::Running(StdioProcess {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            })),
        })
    }

    /// OS process id of the child, if it is still held.
    pub async fn pid(&self) -> Option<u32> {
        match &*self.process.lock().await {
            ProcessSlot::Running(p) => p.child.id(),
            ProcessSlot::Killed(_) | ProcessSlot::Closed => None,
        }
    }
}

impl StdioProcess {
    async fn exchange(&mut self, line: &str) -> Result<Vec<u8>> {
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        self.stdin.flush().await.map_err(TransportError::Write)?;

        let mut buf = String::new();
        loop {
            buf.clear();
            let n = self
                .stdout
                .read_line(&mut buf)
                .await
                .map_err(TransportError::Read)?;
            if n == 0 {
                let status = self
                    .child
                    .try_wait()
                    .ok()
                    .flatten()
                    .map(|s| s.to_string());
                return Err(TransportError::ProcessExited { status }.into());
            }
            let trimmed = buf.trim();
            if !trimmed.is_empty() {
                debug!(raw = %trimmed, "tool server -> client");
                return Ok(trimmed.as_bytes().to_vec());
            }
        }
    }

    async fn terminate(mut self) {
        drop(self.stdin);
        if let Err(e) = self.child.kill().await {
            // Already exited is reported as an error by some platforms.
            debug!(error = %e, "kill on tool server process failed");
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    fn kind(&self) -> &'static str {
        "stdio"
    }

    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> Result<Vec<u8>> {
        let line = codec::encode_line(request)?;
        let deadline = Instant::now() + timeout;
        let timed_out = || -> Error {
            TransportError::Timeout {
                method: request.method.clone(),
                after: timeout,
            }
            .into()
        };

        let Ok(mut slot) = tokio::time::timeout_at(deadline, self.process.lock()).await else {
            warn!(
                command = %self.command,
                method = %request.method,
                timeout = ?timeout,
                "tool server stayed busy with earlier calls past the deadline"
            );
            return Err(timed_out());
        };
        let process = match &mut *slot {
            ProcessSlot::Running(process) => process,
            ProcessSlot::Killed(reason) => {
                return Err(TransportError::Terminated {
                    reason: reason.clone(),
                }
                .into());
            },
            ProcessSlot::Closed => return Err(TransportError::Closed.into()),
        };

        debug!(method = %request.method, id = request.id, "client -> tool server");

        match tokio::time::timeout_at(deadline, process.exchange(&line)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => {
                if matches!(
                    e,
                    Error::Transport(
                        TransportError::ProcessExited { .. } | TransportError::Write(_)
                    )
                ) && let Some(dead) = slot.kill_with(e.to_string())
                {
                    warn!(command = %self.command, error = %e, "tool server process is gone");
                    dead.terminate().await;
                }
                Err(e)
            },
            Err(_) => {
                let err = timed_out();
                warn!(
                    command = %self.command,
                    method = %request.method,
                    timeout = ?timeout,
                    "tool server did not answer in time, killing process"
                );
                if let Some(stuck) = slot.kill_with(err.to_string()) {
                    stuck.terminate().await;
                }
                Err(err)
            },
        }
    }

    async fn abandon(&self, reason: &str) {
        if let Some(process) = self.process.lock().await.kill_with(reason.to_string()) {
            warn!(
                command = %self.command,
                reason = %reason,
                "tool server output is out of step with requests, killing process"
            );
            process.terminate().await;
        }
    }

    async fn is_alive(&self) -> bool {
        // A held lock means a call is in flight on a live process.
        let Ok(mut slot) = self.process.try_lock() else {
            return true;
        };
        match &mut *slot {
            ProcessSlot::Running(p) => matches!(p.child.try_wait(), Ok(None)),
            ProcessSlot::Killed(_) | ProcessSlot::Closed => false,
        }
    }

    async fn close(&self) {
        let mut slot = self.process.lock().await;
        if let ProcessSlot::Running(process) = std::mem::replace(&mut *slot, ProcessSlot::Closed) {
            info!(command = %self.command, "stopping tool server process");
            process.terminate().await;
        }
    }
}
