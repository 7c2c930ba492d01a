//! Timeout enforcement.
//!
//! # Responsibilities
//! - Derive per-call transport timeouts from configuration
//! - Bound the wait for response headers separately from the whole attempt
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors and count as transient

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::TimeoutConfig;

/// A stage of a downstream call ran past its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stage} timed out after {limit:?}")]
pub struct TimedOut {
    pub stage: &'static str,
    pub limit: Duration,
}

/// Resolved transport timeouts for the downstream client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// TCP connect plus TLS handshake.
    pub connect: Duration,
    pub response_header: Duration,
    pub request: Duration,
    pub pool_idle: Duration,
}

impl From<&TimeoutConfig> for TransportTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs + config.tls_handshake_secs),
            response_header: Duration::from_secs(config.response_header_secs),
            request: Duration::from_secs(config.request_secs),
            pool_idle: Duration::from_secs(config.idle_secs),
        }
    }
}

/// Await `fut`, failing with [`TimedOut`] once `limit` elapses.
pub async fn within<F: Future>(stage: &'static str, limit: Duration, fut: F) -> Result<F::Output, TimedOut> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut { stage, limit })
}
