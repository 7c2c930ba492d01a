//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream call:
//!     → circuit_breaker.rs (reject immediately if open)
//!     → retries.rs (re-issue transient failures, watch for cancellation)
//!         → backoff.rs (linear wait + jitter between attempts)
//!         → timeouts.rs (bound each attempt)
//!         → raw transport call
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Breaker and retries are independent decorators around one call closure
//! - The breaker sees one result per logical call, after retries
//! - Breakers are process-wide, one per named dependency

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerRegistry, CircuitState, Rejected};
pub use retries::{default_retry_policy, Cancelled, RetryExecutor, Retryable};
pub use timeouts::{TimedOut, TransportTimeouts};
