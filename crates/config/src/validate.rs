//! Semantic validation of a loaded configuration.

use crate::schema::StockwireConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "mcp.url"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Check the transport-specific requirements of the config.
#[must_use]
pub fn validate(config: &StockwireConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mcp = &config.mcp;

    match mcp.transport.as_str() {
        "http" => {
            if mcp.url.trim().is_empty() {
                result.push(Severity::Error, "mcp.url", "http transport requires a url");
            } else if let Err(e) = url::Url::parse(&mcp.url) {
                result.push(
                    Severity::Error,
                    "mcp.url",
                    format!("invalid url '{}': {e}", mcp.url),
                );
            }
            if !mcp.command.is_empty() {
                result.push(
                    Severity::Warning,
                    "mcp.command",
                    "command is ignored by the http transport",
                );
            }
        },
        "stdio" | "stdio-oneshot" => {
            if mcp.command.trim().is_empty() {
                result.push(
                    Severity::Error,
                    "mcp.command",
                    format!("{} transport requires a command", mcp.transport),
                );
            }
        },
        other => result.push(
            Severity::Error,
            "mcp.transport",
            format!("unknown transport '{other}' (expected http, stdio or stdio-oneshot)"),
        ),
    }

    let timeouts = &mcp.timeouts;
    for (path, value) in [
        ("mcp.timeouts.discovery_secs", timeouts.discovery_secs),
        ("mcp.timeouts.call_secs", timeouts.call_secs),
        ("mcp.timeouts.subprocess_call_secs", timeouts.subprocess_call_secs),
    ] {
        if value == 0 {
            result.push(Severity::Error, path, "timeout must be greater than zero");
        }
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(!validate(&StockwireConfig::default()).has_errors());
    }

    #[test]
    fn stdio_without_command_is_an_error() {
        let mut cfg = StockwireConfig::default();
        cfg.mcp.transport = "stdio".into();
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "mcp.command");
    }

    #[test]
    fn bad_url_and_zero_timeout_both_reported() {
        let mut cfg = StockwireConfig::default();
        cfg.mcp.url = "not a url".into();
        cfg.mcp.timeouts.call_secs = 0;
        let paths: Vec<_> = validate(&cfg)
            .diagnostics
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert_eq!(paths, vec!["mcp.url", "mcp.timeouts.call_secs"]);
    }

    #[test]
    fn unknown_transport_is_an_error() {
        let mut cfg = StockwireConfig::default();
        cfg.mcp.transport = "websocket".into();
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert!(result.diagnostics[0].to_string().contains("websocket"));
    }

    #[test]
    fn http_with_command_only_warns() {
        let mut cfg = StockwireConfig::default();
        cfg.mcp.command = "node".into();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    }
}
