//! Retry logic.
//!
//! # Responsibilities
//! - Run a fallible downstream operation within a fixed attempt budget
//! - Decide whether an error is worth another attempt
//! - Wait with linear backoff + jitter between attempts
//! - Stop as soon as the caller's cancellation token fires
//!
//! # Design Decisions
//! - Only the most recent error is reported when the budget runs out
//! - Connection errors, 429 and 5xx (except 501) are transient; everything else fails fast
//! - Jittered backoff prevents thundering herd across concurrent callers

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::resilience::backoff::backoff_with_hint;

/// Marker error: the caller cancelled (or its deadline passed) before the
/// operation could finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Errors that carry enough information for the default retry policy.
pub trait Retryable {
    /// Whether the failure is transient and worth another attempt.
    fn is_transient(&self) -> bool;

    /// Server-provided wait hint, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// The default retry predicate: retry transient errors only.
pub fn default_retry_policy<E: Retryable>(error: &E) -> bool {
    error.is_transient()
}

/// Decide if an HTTP status code is transient.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status != 501)
}

/// Runs an operation up to `max_attempts` times.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    min_wait_ms: u64,
    max_wait_ms: u64,
}

impl RetryExecutor {
    pub fn new(max_attempts: u32, min_wait_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_wait_ms,
            max_wait_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.min_wait_ms, config.max_wait_ms)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute `op` until it succeeds, returns a non-retryable error, the
    /// attempt budget is exhausted, or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. `on_retry` is called with
    /// the attempt that just failed, before the backoff wait.
    pub async fn execute<T, E, Op, Fut, P, R>(
        &self,
        cancel: &CancellationToken,
        mut op: Op,
        should_retry: P,
        mut on_retry: R,
    ) -> Result<T, E>
    where
        E: Retryable + From<Cancelled> + std::fmt::Display,
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        R: FnMut(u32, &E),
    {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(E::from(Cancelled));
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(E::from(Cancelled)),
                result = op(attempt) => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.max_attempts || !should_retry(&error) {
                if attempt > 1 {
                    tracing::debug!(
                        attempts = attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %error,
                        "Giving up after retries"
                    );
                }
                return Err(error);
            }

            on_retry(attempt, &error);

            let delay = backoff_with_hint(attempt, self.min_wait_ms, self.max_wait_ms, error.retry_after());
            tracing::debug!(attempt, delay = ?delay, error = %error, "Retrying after backoff");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(E::from(Cancelled)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
