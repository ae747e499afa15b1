//! Config schema for stockwire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockwireConfig {
    /// The tool server the bridge talks to.
    pub mcp: McpServerEntry,
}

/// Configuration for the tool server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerEntry {
    /// Display name used in logs.
    pub name: String,
    /// Transport type: "http" (default), "stdio" or "stdio-oneshot".
    pub transport: String,
    /// Base URL for the HTTP transport.
    pub url: String,
    /// Command to spawn the server process (stdio transports).
    pub command: String,
    /// Arguments to the command.
    pub args: Vec<String>,
    /// Environment variables to set for the process.
    pub env: HashMap<String, String>,
    /// Tool names advertised as placeholders when the server is unreachable.
    pub expected_tools: Vec<String>,
    pub timeouts: TimeoutsConfig,
}

impl Default for McpServerEntry {
    fn default() -> Self {
        Self {
            name: "stocks".into(),
            transport: "http".into(),
            url: "http://mcp-server:3000".into(),
            command: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            expected_tools: Vec::new(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Health probe and `tools/list`.
    pub discovery_secs: u64,
    /// `tools/call` over HTTP.
    pub call_secs: u64,
    /// `tools/call` over a subprocess.
    pub subprocess_call_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            discovery_secs: 10,
            call_secs: 30,
            subprocess_call_secs: 10,
        }
    }
}
