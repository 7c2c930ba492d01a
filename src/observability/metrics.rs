//! Metrics collection and exposition.
//!
//! # Metrics
//! - `downstream_requests_total` (counter): downstream calls by operation, outcome
//! - `downstream_request_duration_seconds` (histogram): latency per logical call
//! - `downstream_retries_total` (counter): re-issued attempts by operation
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `circuit_breaker_rejections_total` (counter): calls refused by a breaker
//! - `bulk_items_total` (counter): bulk outcomes by success/failure
//! - `bulk_steps_total` (counter): steps executed
//! - `bulk_duration_seconds` (histogram): wall time of a bulk run
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder (tests, embedding) every call is a no-op
//! - Exposition via the Prometheus recorder, rendered by the HTTP server

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use crate::resilience::CircuitState;

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the global Prometheus recorder and return the render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)?
        .install_recorder()
}

/// Record a completed logical downstream call.
pub fn record_downstream_call(operation: &'static str, outcome: &'static str, start: Instant) {
    counter!("downstream_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
    histogram!("downstream_request_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(operation: &'static str) {
    counter!("downstream_retries_total", "operation" => operation).increment(1);
}

pub fn record_breaker_state(name: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("circuit_breaker_state", "name" => name.to_string()).set(value);
}

pub fn record_breaker_rejection(name: &str) {
    counter!("circuit_breaker_rejections_total", "name" => name.to_string()).increment(1);
}

pub fn record_bulk_step() {
    counter!("bulk_steps_total").increment(1);
}

pub fn record_bulk_run(succeeded: usize, failed: usize, start: Instant) {
    counter!("bulk_items_total", "outcome" => "success").increment(succeeded as u64);
    counter!("bulk_items_total", "outcome" => "failure").increment(failed as u64);
    histogram!("bulk_duration_seconds").record(start.elapsed().as_secs_f64());
}
