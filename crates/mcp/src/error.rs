use std::{io, time::Duration};

use stockwire_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server could not be reached or spawned.
    #[error("cannot connect to tool server: {message}")]
    Connection { message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The remote tool reported an error.
    #[error("{message}")]
    Tool { message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn tool(message: impl Into<String>) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

/// Failures on an otherwise live session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("'{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("tool server process exited ({})", .status.as_deref().unwrap_or("status unknown"))]
    ProcessExited { status: Option<String> },
    #[error("session is closed")]
    Closed,
    /// The transport killed the server process; later calls report why.
    #[error("tool server process was stopped ({reason})")]
    Terminated { reason: String },
    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),
    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("method '{0}' is not supported by this transport")]
    UnsupportedMethod(String),
}

/// Malformed inbound envelopes. Callers treat these like transport failures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty response from tool server")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response has neither result nor error")]
    MissingPayload,
    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch {
        expected: u64,
        actual: serde_json::Value,
    },
    #[error("HTTP {status} response body is not valid JSON: {reason}")]
    UnparseableBody { status: u16, reason: String },
    #[error("malformed tools/call result: {0}")]
    CallResult(String),
    #[error("no response line found in tool server output")]
    NoResponse,
}

pub type Result<T> = std::result::Result<T, Error>;

stockwire_common::impl_context!();

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_method_and_duration() {
        let err: Error = TransportError::Timeout {
            method: "tools/call".into(),
            after: Duration::from_secs(10),
        }
        .into();
        assert_eq!(err.to_string(), "'tools/call' timed out after 10s");
    }

    #[test]
    fn process_exit_without_status() {
        let err = TransportError::ProcessExited { status: None };
        assert_eq!(
            err.to_string(),
            "tool server process exited (status unknown)"
        );
    }

    #[test]
    fn option_context_builds_message_error() {
        let err = None::<u8>.context("no stdout pipe").unwrap_err();
        assert!(matches!(err, Error::Message { ref message } if message == "no stdout pipe"));
    }
}
