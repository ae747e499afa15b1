//! Connection settings for a single tool server.

use std::{collections::HashMap, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Transport type for the tool server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    #[default]
    Http,
    Stdio,
    #[serde(rename = "stdio-oneshot")]
    StdioOneShot,
}

impl FromStr for TransportType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stdio" => Ok(Self::Stdio),
            "stdio-oneshot" => Ok(Self::StdioOneShot),
            other => Err(crate::Error::message(format!(
                "unknown transport '{other}' (expected http, stdio or stdio-oneshot)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Health probe and `tools/list`.
    pub discovery: Duration,
    /// `tools/call` over HTTP; upstream data fetches may be slow.
    pub call: Duration,
    /// `tools/call` over a subprocess.
    pub subprocess_call: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            discovery: Duration::from_secs(10),
            call: Duration::from_secs(30),
            subprocess_call: Duration::from_secs(10),
        }
    }
}

/// Configuration for a single tool server.
#[derive(Debug, Clone, Default)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: TransportType,
    /// Base URL. Required when `transport` is `Http`.
    pub url: Option<String>,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Advertised as placeholders when the server is unreachable.
    pub expected_tools: Vec<String>,
    pub timeouts: Timeouts,
}

impl McpServerConfig {
    pub fn http(name: &str, url: &str) -> Self {
        Self {
            name: name.into(),
            transport: TransportType::Http,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn stdio(name: &str, command: &str, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            transport: TransportType::Stdio,
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_expected_tools(mut self, tools: &[&str]) -> Self {
        self.expected_tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Timeout applied to `tools/call` for this server's transport.
    pub fn call_timeout(&self) -> Duration {
        match self.transport {
            TransportType::Http => self.timeouts.call,
            TransportType::Stdio | TransportType::StdioOneShot => self.timeouts.subprocess_call,
        }
    }
}
