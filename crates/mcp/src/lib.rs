//! Tool-invocation bridge between an agent and an external tool server.
//!
//! This crate provides:
//! - JSON-RPC 2.0 envelopes and the protocol codec (`types`, `codec`)
//! - Transports: HTTP service (`http_transport`), long-lived subprocess
//!   (`transport`) and spawn-per-call subprocess (`oneshot_transport`)
//! - Sessions, tool discovery and the invocation client (`session`,
//!   `registry`, `client`)
//! - Degraded-mode placeholders (`fallback`) and agent tool adapters
//!   (`tool_bridge`, `stocks`)

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http_transport;
pub mod oneshot_transport;
pub mod registry;
pub mod session;
pub mod stocks;
pub mod tool_bridge;
pub mod traits;
pub mod transport;
pub mod types;

pub use {
    client::{McpClient, McpClientState},
    config::{McpServerConfig, Timeouts, TransportType},
    error::{DecodeError, Error, Result, TransportError},
    registry::ToolRegistry,
    session::Session,
    stocks::StockTools,
    tool_bridge::{McpAgentTool, McpToolBridge},
    traits::McpTransport,
    types::{Capability, ToolCallRequest, ToolCallResult, ToolDescriptor},
};
