//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ratios within bounds)
//! - Validate the downstream host URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, including on hot reload

use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, CircuitBreakerConfig, DynamicConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the static application configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    let client = &config.service_api_client;
    match Url::parse(&client.host) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "service_api_client.host",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "service_api_client.host",
            format!("'{}' is not a valid URL: {}", client.host, e),
        )),
    }
    if client.max_connections == 0 {
        errors.push(ValidationError::new("service_api_client.max_connections", "must be > 0"));
    }

    let timeouts = &client.timeouts;
    for (field, value) in [
        ("service_api_client.timeouts.connect_secs", timeouts.connect_secs),
        ("service_api_client.timeouts.response_header_secs", timeouts.response_header_secs),
        ("service_api_client.timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }

    let retries = &client.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("service_api_client.retries.max_attempts", "must be >= 1"));
    }
    if retries.min_wait_ms > retries.max_wait_ms {
        errors.push(ValidationError::new(
            "service_api_client.retries.min_wait_ms",
            format!("{} exceeds max_wait_ms {}", retries.min_wait_ms, retries.max_wait_ms),
        ));
    }

    validate_breaker(&client.circuit_breaker, &mut errors);

    if config.bulk.deadline_secs == 0 {
        errors.push(ValidationError::new("bulk.deadline_secs", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(cb: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if cb.name.trim().is_empty() {
        errors.push(ValidationError::new("service_api_client.circuit_breaker.name", "must not be empty"));
    }
    if cb.max_requests == 0 {
        errors.push(ValidationError::new("service_api_client.circuit_breaker.max_requests", "must be >= 1"));
    }
    if cb.timeout_secs == 0 {
        errors.push(ValidationError::new("service_api_client.circuit_breaker.timeout_secs", "must be > 0"));
    }
    if !(cb.failure_threshold > 0.0 && cb.failure_threshold <= 1.0) {
        errors.push(ValidationError::new(
            "service_api_client.circuit_breaker.failure_threshold",
            format!("{} is outside (0, 1]", cb.failure_threshold),
        ));
    }
}

/// Validate the hot-reloadable tunables.
pub fn validate_dynamic(config: &DynamicConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.number_of_parallel_requests == 0 {
        errors.push(ValidationError::new("number_of_parallel_requests", "must be >= 1"));
    }
    if config.number_of_steps == 0 {
        errors.push(ValidationError::new("number_of_steps", "must be >= 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
