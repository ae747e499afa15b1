//! HTTP transport for a tool server running as a long-lived service.
//!
//! The server exposes REST-ish endpoints rather than a JSON-RPC endpoint, so
//! each method is mapped onto one of them and the HTTP reply is re-wrapped as
//! a response envelope carrying the request id:
//!
//! | method       | endpoint            |
//! |--------------|---------------------|
//! | `tools/list` | `GET  /tools`       |
//! | `tools/call` | `POST /tools/call`  |
//!
//! `GET /health` is the readiness probe used at connect time.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use {
    async_trait::async_trait,
    reqwest::{Client, StatusCode},
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    codec,
    error::{DecodeError, Error, Result, TransportError},
    traits::McpTransport,
    types::{JsonRpcRequest, JsonRpcResponse, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST},
};

const UNKNOWN_ERROR: &str = "Unknown error";
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpTransport {
    client: Client,
    base_url: String,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Validate the URL and probe `GET /health`; only HTTP 200 counts as healthy.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::connection(format!("invalid tool server url '{base_url}': {e}")))?;

        let client = Client::builder()
            .build()
            .map_err(|e| Error::connection(format!("failed to build HTTP client: {e}")))?;

        let transport = Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        };

        let health = transport.endpoint("health");
        info!(url = %health, "probing tool server health");

        let resp = transport
            .client
            .get(&health)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::connection(format!("health check to {health} failed: {e}")))?;

        if resp.status() != StatusCode::OK {
            return Err(Error::connection(format!(
                "tool server health check failed: HTTP {}",
                resp.status()
            )));
        }

        info!(url = %transport.base_url, "tool server is healthy");
        Ok(transport)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn map_send_error(method: &str, timeout: Duration, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            TransportError::Timeout {
                method: method.to_string(),
                after: timeout,
            }
            .into()
        } else {
            TransportError::Http(err).into()
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and the
/// `{"content": [{"text": ...}], "isError": true}` shape.
fn error_body_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return UNKNOWN_ERROR.to_string();
    };

    if let Some(message) = value.get("error").and_then(codec::error_message) {
        return message;
    }

    value
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.iter().find_map(|c| c.get("text")?.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

#[async_trait]
impl McpTransport for HttpTransport {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> Result<Vec<u8>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        let method = request.method.as_str();
        let builder = match method {
            METHOD_TOOLS_LIST => self.client.get(self.endpoint("tools")),
            METHOD_TOOLS_CALL => self
                .client
                .post(self.endpoint("tools/call"))
                .json(request.params.as_ref().unwrap_or(&Value::Null)),
            other => return Err(TransportError::UnsupportedMethod(other.to_string()).into()),
        };

        debug!(method = %method, id = request.id, url = %self.base_url, "HTTP client -> tool server");

        // Dropping the in-flight request on timeout closes its connection.
        let resp = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(method, timeout, e))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(method, timeout, e))?;

        let envelope = if status.is_success() {
            let result: Value =
                serde_json::from_slice(&body).map_err(|e| DecodeError::UnparseableBody {
                    status: status.as_u16(),
                    reason: e.to_string(),
                })?;
            JsonRpcResponse::with_result(request.id, result)
        } else {
            let message = error_body_message(&body);
            warn!(method = %method, %status, error = %message, "tool server returned an error status");
            JsonRpcResponse::with_error(request.id, i64::from(status.as_u16()), message)
        };

        Ok(serde_json::to_vec(&envelope)?)
    }

    async fn is_alive(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match self
            .client
            .get(self.endpoint("health"))
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(_) => false,
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(url = %self.base_url, "closed HTTP tool server transport");
        }
    }
}
