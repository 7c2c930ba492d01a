//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root (static) configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,

    /// Downstream service API client settings.
    pub service_api_client: ClientConfig,

    /// Bulk retrieval settings that are not hot-reloadable.
    pub bulk: BulkConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one inbound request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Downstream service API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the downstream service API (e.g., "http://localhost:8081").
    pub host: String,

    /// Maximum idle connections kept in the pool per host.
    pub max_connections: usize,

    /// Per-call timeouts.
    pub timeouts: TimeoutConfig,

    /// Retry policy.
    pub retries: RetryConfig,

    /// Circuit breaker guarding the downstream dependency.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8081".to_string(),
            max_connections: 200,
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Timeout configuration for downstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// TLS handshake allowance in seconds (added on top of connect).
    pub tls_handshake_secs: u64,

    /// Time to wait for response headers once the request is sent, in seconds.
    pub response_header_secs: u64,

    /// Overall timeout for a single attempt, in seconds.
    pub request_secs: u64,

    /// How long an idle pooled connection is kept, in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 30,
            tls_handshake_secs: 10,
            response_header_secs: 10,
            request_secs: 30,
            idle_secs: 90,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Lower bound of the wait between attempts in milliseconds.
    pub min_wait_ms: u64,

    /// Upper bound of the wait between attempts in milliseconds.
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait_ms: 100,
            max_wait_ms: 10_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Name of the guarded dependency (used for logs and metrics).
    pub name: String,

    /// Trial calls allowed while half-open.
    pub max_requests: u32,

    /// Length of the rolling counts window in seconds (0 = never reset while closed).
    pub interval_secs: u64,

    /// Time spent open before probing again, in seconds.
    pub timeout_secs: u64,

    /// Minimum requests in the window before the breaker may trip.
    pub requests_volume_threshold: u32,

    /// Failure ratio (0.0..=1.0) at or above which the breaker trips.
    pub failure_threshold: f64,
}

impl CircuitBreakerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "service-api".to_string(),
            max_requests: 1,
            interval_secs: 60,
            timeout_secs: 30,
            requests_volume_threshold: 5,
            failure_threshold: 0.5,
        }
    }
}

/// Static bulk retrieval settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Deadline for a whole bulk run in seconds. When it elapses,
    /// outstanding items fail as cancelled.
    pub deadline_secs: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { deadline_secs: 25 }
    }
}

/// Hot-reloadable tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicConfig {
    /// Maximum in-flight downstream calls within one step.
    pub number_of_parallel_requests: usize,

    /// Number of sequential steps a bulk run is split into.
    pub number_of_steps: usize,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            number_of_parallel_requests: 10,
            number_of_steps: 1,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose the Prometheus `/metrics` endpoint.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}
