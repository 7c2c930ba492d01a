//! Shared HTTP transport for downstream calls.

use std::time::Duration;

use crate::client::error::ClientError;
use crate::config::ClientConfig;
use crate::resilience::TransportTimeouts;

/// Build the pooled HTTP client shared by every downstream call.
///
/// Idle connections per host are capped at `max_connections`. The connect
/// timeout covers TCP connect plus TLS handshake; the response-header
/// timeout is enforced per attempt by the caller.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    let timeouts = TransportTimeouts::from(&config.timeouts);

    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .pool_max_idle_per_host(config.max_connections)
        .pool_idle_timeout(timeouts.pool_idle)
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent(concat!("service-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::Transport)
}
