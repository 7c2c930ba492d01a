//! Downstream client errors.

use std::time::Duration;
use thiserror::Error;

use crate::resilience::retries::is_retryable_status;
use crate::resilience::{Cancelled, Rejected, Retryable, TimedOut};

/// Failure of one logical downstream operation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid downstream URL: {0}")]
    InvalidUrl(String),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request to downstream failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error(transparent)]
    Timeout(#[from] TimedOut),

    #[error("unexpected response status: {status}")]
    UnexpectedStatus {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    CircuitOpen(#[from] Rejected),

    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// HTTP status returned by the downstream, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::InvalidUrl(_) | ClientError::Encode(_) => "request_error",
            ClientError::Transport(_) => "transport_error",
            ClientError::Timeout(_) => "timeout",
            ClientError::UnexpectedStatus { .. } => "unexpected_status",
            ClientError::Decode(_) => "decode_error",
            ClientError::CircuitOpen(_) => "circuit_open",
            ClientError::Cancelled => "cancelled",
        }
    }
}

impl From<Cancelled> for ClientError {
    fn from(_: Cancelled) -> Self {
        ClientError::Cancelled
    }
}

impl Retryable for ClientError {
    fn is_transient(&self) -> bool {
        match self {
            // Builder and redirect-loop failures will fail the same way again.
            ClientError::Transport(e) => !(e.is_builder() || e.is_redirect() || e.is_decode()),
            ClientError::Timeout(_) => true,
            ClientError::UnexpectedStatus { status, .. } => is_retryable_status(*status),
            ClientError::InvalidUrl(_)
            | ClientError::Encode(_)
            | ClientError::Decode(_)
            | ClientError::CircuitOpen(_)
            | ClientError::Cancelled => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::UnexpectedStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> ClientError {
        ClientError::UnexpectedStatus {
            status,
            retry_after: None,
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(!status(501).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(400).is_transient());
    }

    #[test]
    fn test_terminal_errors() {
        assert!(!ClientError::Cancelled.is_transient());
        assert!(!ClientError::CircuitOpen(Rejected::Open("svc".into())).is_transient());
        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        assert!(!ClientError::Decode(decode).is_transient());
        assert!(ClientError::Timeout(TimedOut {
            stage: "response headers",
            limit: Duration::from_secs(1)
        })
        .is_transient());
    }

    #[test]
    fn test_messages() {
        assert_eq!(status(503).to_string(), "unexpected response status: 503");
        assert_eq!(status(503).status(), Some(503));
        assert_eq!(ClientError::Cancelled.to_string(), "request cancelled");
        assert_eq!(
            ClientError::CircuitOpen(Rejected::Open("service-api".into())).to_string(),
            "circuit breaker 'service-api' is open"
        );
    }
}
