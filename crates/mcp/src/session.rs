//! A session owns one transport handle and one id counter.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    codec,
    config::{McpServerConfig, TransportType},
    error::{Error, Result},
    http_transport::HttpTransport,
    oneshot_transport::OneShotStdioTransport,
    traits::McpTransport,
    transport::StdioTransport,
    types::{JsonRpcRequest, JsonRpcResponse, ToolCallRequest, ToolCallResult, ToolDescriptor},
};

pub struct Session {
    transport: Arc<dyn McpTransport>,
    next_id: AtomicU64,
    discovery_timeout: Duration,
    call_timeout: Duration,
}

impl Session {
    /// Open the transport selected by `config`.
    pub async fn open(config: &McpServerConfig) -> Result<Self> {
        let transport: Arc<dyn McpTransport> = match config.transport {
            TransportType::Http => {
                let url = config.url.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                    Error::connection(format!("http transport for '{}' requires a url", config.name))
                })?;
                Arc::new(HttpTransport::connect(url, config.timeouts.discovery).await?)
            },
            TransportType::Stdio => Arc::new(StdioTransport::spawn(
                &config.command,
                &config.args,
                &config.env,
            )?),
            TransportType::StdioOneShot => Arc::new(OneShotStdioTransport::new(
                &config.command,
                &config.args,
                &config.env,
            )?),
        };

        info!(server = %config.name, transport = transport.kind(), "session opened");
        Ok(Self::new(
            transport,
            config.timeouts.discovery,
            config.call_timeout(),
        ))
    }

    pub fn new(
        transport: Arc<dyn McpTransport>,
        discovery_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            discovery_timeout,
            call_timeout,
        }
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn exchange(&self, request: JsonRpcRequest, timeout: Duration) -> Result<JsonRpcResponse> {
        let raw = self.transport.send(&request, timeout).await?;
        let expected = self
            .transport
            .checks_response_ids()
            .then_some(request.id);
        let response = match codec::decode(&raw, expected) {
            Ok(response) => response,
            Err(e) => {
                self.transport.abandon(&e.to_string()).await;
                return Err(e.into());
            },
        };
        debug!(method = %request.method, id = request.id, "tool server answered");
        Ok(response)
    }

    /// Fetch the tool list. Errors here are for the registry to swallow.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let request = codec::encode_list_tools(self.next_id());
        let response = self.exchange(request, self.discovery_timeout).await?;
        codec::tools_or_error(&response)
    }

    /// Call one tool. Remote tool errors come back as `Ok(Failure)`; only
    /// transport and decode problems are `Err`.
    pub async fn call_tool(&self, call: &ToolCallRequest) -> Result<ToolCallResult> {
        let request = codec::encode_call(self.next_id(), call)?;
        let response = self.exchange(request, self.call_timeout).await?;
        Ok(codec::decode_call(&response)?)
    }

    pub async fn is_alive(&self) -> bool {
        self.transport.is_alive().await
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::{DecodeError, TransportError},
        async_trait::async_trait,
        serde_json::json,
        std::sync::Mutex,
    };

    /// Replays canned lines and records the ids it was sent.
    struct ScriptedTransport {
        replies: Mutex<Vec<Vec<u8>>>,
        seen_ids: Mutex<Vec<u64>>,
        abandoned: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.as_bytes().to_vec()).collect()),
                seen_ids: Mutex::new(Vec::new()),
                abandoned: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl McpTransport for ScriptedTransport {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        async fn send(&self, request: &JsonRpcRequest, _timeout: Duration) -> Result<Vec<u8>> {
            self.seen_ids.lock().unwrap().push(request.id);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| TransportError::Closed.into())
        }

        async fn abandon(&self, reason: &str) {
            self.abandoned.lock().unwrap().push(reason.to_string());
        }

        async fn is_alive(&self) -> bool {
            true
        }

        async fn close(&self) {}
    }

    fn session(transport: Arc<ScriptedTransport>) -> Session {
        Session::new(transport, Duration::from_secs(1), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn ids_increase_per_request() {
        let transport = ScriptedTransport::new(&[
            r#"{"id":1,"result":{"tools":[]}}"#,
            r#"{"id":2,"result":{"content":[{"text":"ok"}]}}"#,
        ]);
        let session = session(Arc::clone(&transport));
        session.list_tools().await.unwrap();
        session
            .call_tool(&ToolCallRequest::new("x", Default::default()))
            .await
            .unwrap();
        assert_eq!(*transport.seen_ids.lock().unwrap(), vec![1, 2]);
        assert!(transport.abandoned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mismatched_id_is_rejected() {
        let transport = ScriptedTransport::new(&[r#"{"id":42,"result":{"content":[]}}"#]);
        let err = session(Arc::clone(&transport))
            .call_tool(&ToolCallRequest::new("x", Default::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::IdMismatch { expected: 1, .. })));
        let abandoned = transport.abandoned.lock().unwrap();
        assert_eq!(abandoned.len(), 1);
        assert!(abandoned[0].contains("does not match"));
    }

    #[tokio::test]
    async fn malformed_line_abandons_the_transport() {
        let transport = ScriptedTransport::new(&["warming cache"]);
        let err = session(Arc::clone(&transport)).list_tools().await.unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Malformed(_))));
        assert_eq!(transport.abandoned.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remote_error_is_a_failure_not_an_err() {
        let transport =
            ScriptedTransport::new(&[r#"{"id":1,"error":{"code":-32602,"message":"bad symbol"}}"#]);
        let args = json!({"symbol": "???"}).as_object().cloned().unwrap();
        let result = session(transport)
            .call_tool(&ToolCallRequest::new("get_stock_price", args))
            .await
            .unwrap();
        assert_eq!(result, ToolCallResult::failure("bad symbol"));
    }
}
