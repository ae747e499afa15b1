//! Invocation client: the only surface the agent talks to.
//!
//! Construction never fails. It opens a session and discovers tools; if
//! either step comes up empty the client is built `Degraded` and every call
//! short-circuits to a failure without touching the network or a process.
//! There is no way back from `Degraded`: build a new client to retry.

use std::sync::atomic::{AtomicBool, Ordering};

use {
    serde_json::{Map, Value},
    tracing::{debug, info, warn},
};

use crate::{
    config::McpServerConfig,
    fallback,
    registry::ToolRegistry,
    session::Session,
    types::{Capability, ToolCallRequest, ToolCallResult, ToolDescriptor},
};

/// Lifecycle of a client.
///
/// `Uninitialized` and `Initializing` are only observed during
/// construction; a constructed client is `Ready`, `Degraded` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpClientState {
    Uninitialized,
    /// Opening the transport and discovering tools.
    Initializing,
    /// Live transport and at least one tool.
    Ready,
    /// No live server; calls fail fast.
    Degraded,
    /// `close()` was called.
    Closed,
}

enum Availability {
    Ready {
        session: Session,
        registry: ToolRegistry,
    },
    Degraded {
        reason: String,
        placeholders: Vec<ToolDescriptor>,
    },
}

pub struct McpClient {
    server_name: String,
    availability: Availability,
    closed: AtomicBool,
}

impl McpClient {
    /// Open the configured transport and discover tools.
    pub async fn connect(config: &McpServerConfig) -> Self {
        debug!(server = %config.name, state = ?McpClientState::Uninitialized, "building MCP client");
        info!(
            server = %config.name,
            transport = ?config.transport,
            state = ?McpClientState::Initializing,
            "connecting to tool server"
        );

        match Session::open(config).await {
            Ok(session) => {
                Self::from_session(&config.name, session, &config.expected_tools).await
            },
            Err(e) => Self::degraded(&config.name, e.to_string(), &config.expected_tools),
        }
    }

    /// Run discovery on an already open session.
    pub async fn from_session(server_name: &str, session: Session, expected_tools: &[String]) -> Self {
        let registry = ToolRegistry::discover(&session).await;
        if registry.is_empty() {
            // Nothing can be called; release the process/connection now.
            session.close().await;
            return Self::degraded(
                server_name,
                "the tool server returned no tools".to_string(),
                expected_tools,
            );
        }

        info!(
            server = %server_name,
            tools = registry.len(),
            state = ?McpClientState::Ready,
            "tool server ready"
        );
        Self {
            server_name: server_name.to_string(),
            availability: Availability::Ready { session, registry },
            closed: AtomicBool::new(false),
        }
    }

    /// A client with no server behind it.
    pub fn degraded(server_name: &str, reason: String, expected_tools: &[String]) -> Self {
        warn!(
            server = %server_name,
            reason = %reason,
            state = ?McpClientState::Degraded,
            "tool server unavailable, using placeholder tools"
        );
        let placeholders = fallback::placeholder_descriptors(server_name, expected_tools, &reason);
        Self {
            server_name: server_name.to_string(),
            availability: Availability::Degraded {
                reason,
                placeholders,
            },
            closed: AtomicBool::new(false),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn state(&self) -> McpClientState {
        if self.closed.load(Ordering::SeqCst) {
            return McpClientState::Closed;
        }
        match self.availability {
            Availability::Ready { .. } => McpClientState::Ready,
            Availability::Degraded { .. } => McpClientState::Degraded,
        }
    }

    /// Why the client is degraded, if it is.
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.availability {
            Availability::Degraded { reason, .. } => Some(reason),
            Availability::Ready { .. } => None,
        }
    }

    /// Discovered tools, or the placeholders when degraded. Never empty.
    pub fn tools(&self) -> &[ToolDescriptor] {
        match &self.availability {
            Availability::Ready { registry, .. } => registry.descriptors(),
            Availability::Degraded { placeholders, .. } => placeholders,
        }
    }

    pub fn list_capabilities(&self) -> Vec<Capability> {
        self.tools().iter().map(Capability::from).collect()
    }

    /// Call a tool by name. Never returns an error: every failure mode ends
    /// in [`ToolCallResult::Failure`] with a readable reason.
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> ToolCallResult {
        if self.closed.load(Ordering::SeqCst) {
            return ToolCallResult::failure(format!(
                "the '{}' tool client is closed",
                self.server_name
            ));
        }

        let (session, registry) = match &self.availability {
            Availability::Ready { session, registry } => (session, registry),
            Availability::Degraded { reason, .. } => {
                return fallback::unavailable_result(&self.server_name, name, &arguments, reason);
            },
        };

        if registry.get(name).is_none() {
            let available = registry.names().collect::<Vec<_>>().join(", ");
            return ToolCallResult::failure(format!(
                "Unknown tool '{name}'. Available tools: {available}"
            ));
        }

        let request = ToolCallRequest::new(name, arguments);
        match session.call_tool(&request).await {
            Ok(result) => {
                match &result {
                    ToolCallResult::Success { .. } => {
                        debug!(server = %self.server_name, tool = %name, "tool call succeeded");
                    },
                    ToolCallResult::Failure { reason } => {
                        warn!(server = %self.server_name, tool = %name, error = %reason, "tool reported an error");
                    },
                }
                result
            },
            Err(e) => {
                warn!(server = %self.server_name, tool = %name, error = %e, "tool call failed");
                ToolCallResult::failure(format!("Error calling tool '{name}': {e}"))
            },
        }
    }

    /// Re-check the server (HTTP probe or child status).
    pub async fn is_alive(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        match &self.availability {
            Availability::Ready { session, .. } => session.is_alive().await,
            Availability::Degraded { .. } => false,
        }
    }

    /// Release the session. Idempotent; waits for a child process to exit.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(server = %self.server_name, "closing MCP client");
        }
        if let Availability::Ready { session, .. } = &self.availability {
            session.close().await;
        }
    }
}
