//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events and spans via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → `GET /metrics` (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all spans of an inbound request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
