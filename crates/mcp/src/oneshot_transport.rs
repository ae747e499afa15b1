//! Stdio transport that spawns a fresh process for every request.
//!
//! Higher latency than [`StdioTransport`](crate::transport::StdioTransport)
//! but holds no state between calls, so concurrent calls are safe. The
//! server may print banners or logs on stdout: every line is scanned and the
//! first one that parses as a response envelope wins.

use std::{collections::HashMap, path::PathBuf, process::Stdio, time::Duration};

use {
    async_trait::async_trait,
    serde_json::Value,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        process::{Child, Command},
        time::Instant,
    },
    tracing::{debug, info, warn},
};

use crate::{
    codec,
    error::{Context, DecodeError, Error, Result, TransportError},
    traits::McpTransport,
    types::JsonRpcRequest,
};

pub struct OneShotStdioTransport {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl OneShotStdioTransport {
    /// Resolve the command on `PATH`; nothing is spawned until the first call.
    pub fn new(command: &str, args: &[String], env: &HashMap<String, String>) -> Result<Self> {
        let program = which::which(command)
            .map_err(|e| Error::connection(format!("cannot find '{command}': {e}")))?;
        info!(program = %program.display(), args = ?args, "using one-shot tool server process");
        Ok(Self {
            program,
            args: args.to_vec(),
            env: env.clone(),
        })
    }

    async fn run(&self, line: &str, timeout: Duration, method: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                command: self.program.display().to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().context("failed to capture stdin")?;
        let mut stdout = child.stdout.take().context("failed to capture stdout")?;

        let exchange = async {
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(TransportError::Write)?;
            // EOF on stdin tells the server no more requests are coming.
            drop(stdin);
            let mut output = Vec::new();
            stdout
                .read_to_end(&mut output)
                .await
                .map_err(TransportError::Read)?;
            Ok::<_, Error>(output)
        };

        // Exchange and reap share one deadline.
        let deadline = Instant::now() + timeout;
        let output = match tokio::time::timeout_at(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(method = %method, timeout = ?timeout, "one-shot tool server timed out, killing it");
                kill(&mut child).await;
                return Err(TransportError::Timeout {
                    method: method.to_string(),
                    after: timeout,
                }
                .into());
            },
        };

        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(_)) => {},
            Ok(Err(e)) => debug!(error = %e, "failed to reap one-shot tool server"),
            Err(_) => {
                warn!(method = %method, "one-shot tool server kept running after closing stdout, killing it");
                kill(&mut child).await;
            },
        }
        output
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill on one-shot tool server failed");
    }
}

/// First line that is a JSON object carrying `result` or `error`.
fn first_response_line(output: &[u8]) -> Option<&[u8]> {
    output
        .split(|b| *b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|l| !l.is_empty())
        .find(|l| {
            serde_json::from_slice::<Value>(l)
                .ok()
                .is_some_and(|v| v.get("result").is_some() || v.get("error").is_some())
        })
}

#[async_trait]
impl McpTransport for OneShotStdioTransport {
    fn kind(&self) -> &'static str {
        "stdio-oneshot"
    }

    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> Result<Vec<u8>> {
        let line = codec::encode_line(request)?;
        debug!(method = %request.method, id = request.id, "client -> one-shot tool server");

        let output = self.run(&line, timeout, &request.method).await?;
        first_response_line(&output)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| DecodeError::NoResponse.into())
    }

    fn checks_response_ids(&self) -> bool {
        false
    }

    async fn is_alive(&self) -> bool {
        self.program.exists()
    }

    async fn close(&self) {}
}
