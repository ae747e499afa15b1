//! Transport abstraction shared by the HTTP and subprocess variants.

use std::time::Duration;

use async_trait::async_trait;

use crate::{error::Result, types::JsonRpcRequest};

/// "Send a request, get a response" over some connection to a tool server.
///
/// Opening is done by each implementation's constructor, which fails with
/// [`Error::Connection`](crate::Error::Connection).
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Short label used in logs ("http", "stdio", "stdio-oneshot").
    fn kind(&self) -> &'static str;

    /// Send one envelope and return the raw bytes of the matching response.
    ///
    /// Implementations must give up after `timeout` and release whatever they
    /// were blocked on (kill the child, drop the HTTP request).
    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> Result<Vec<u8>>;

    /// Whether the codec should reject responses whose id differs from the
    /// request id.
    fn checks_response_ids(&self) -> bool {
        true
    }

    /// The session could not match a response to its request. Transports
    /// that pair responses by position drop the connection here so that a
    /// stray line cannot shift every later answer.
    async fn abandon(&self, _reason: &str) {}

    /// Check if the underlying connection/process is still alive.
    async fn is_alive(&self) -> bool;

    /// Release the connection/process. Safe to call more than once.
    async fn close(&self);
}
