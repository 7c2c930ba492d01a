//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: requests >= volume threshold && failures/requests >= failure threshold
//! Open → Half-Open: after `timeout`
//! Half-Open → Closed: `max_requests` consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! State is only re-evaluated when a call asks to pass or reports its result.
//! Each transition (and each expiry of the closed-state window) starts a new
//! generation; results reported against an older generation are ignored.

use dashmap::DashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::HalfOpen => "half-open",
            CircuitState::Open => "open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/result counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    /// Failure ratio of the window; 0.0 for an empty window.
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.total_failures as f64 / self.requests as f64
    }
}

/// Why the breaker refused a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("circuit breaker '{0}' is open")]
    Open(String),

    #[error("circuit breaker '{0}' is half-open and at its trial request limit")]
    TooManyRequests(String),
}

/// Tunables of one breaker.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub max_requests: u32,
    pub interval: Duration,
    pub timeout: Duration,
    pub requests_volume_threshold: u32,
    pub failure_threshold: f64,
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            max_requests: config.max_requests.max(1),
            interval: config.interval(),
            timeout: config.timeout(),
            requests_volume_threshold: config.requests_volume_threshold,
            failure_threshold: config.failure_threshold,
        }
    }
}

impl BreakerSettings {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests > 0
            && counts.requests >= self.requests_volume_threshold
            && counts.failure_ratio() >= self.failure_threshold
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

/// A circuit breaker guarding one named downstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let now = Instant::now();
        let expiry = (!settings.interval.is_zero()).then(|| now + settings.interval);
        let breaker = Self {
            name: name.into(),
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
        };
        metrics::record_breaker_state(&breaker.name, CircuitState::Closed);
        breaker
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.name.clone(), BreakerSettings::from(config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any elapsed timeout.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now())
    }

    /// Counters of the current generation.
    pub fn counts(&self) -> Counts {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now());
        inner.counts
    }

    /// Run `op` through the breaker, counting every error as a failure.
    pub async fn call<T, E, Fut>(&self, op: impl FnOnce() -> Fut) -> Result<T, E>
    where
        E: From<Rejected>,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_with(op, |_| true).await
    }

    /// Run `op` through the breaker. `is_failure` decides which errors count
    /// against the dependency; the rest are recorded as neither.
    pub async fn call_with<T, E, Fut>(
        &self,
        op: impl FnOnce() -> Fut,
        is_failure: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        E: From<Rejected>,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.before_request().map_err(|rejected| {
            metrics::record_breaker_rejection(&self.name);
            E::from(rejected)
        })?;

        let mut pending = Pending {
            breaker: self,
            generation,
            settled: false,
        };
        let result = op().await;
        pending.settled = true;

        match &result {
            Ok(_) => self.after_request(generation, Some(true)),
            Err(e) if is_failure(e) => self.after_request(generation, Some(false)),
            Err(_) => self.after_request(generation, None),
        }
        result
    }

    /// Counters stay consistent across a panic, so a poisoned lock is reused.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn before_request(&self) -> Result<u64, Rejected> {
        let mut inner = self.lock();
        let now = Instant::now();
        let state = self.current_state(&mut inner, now);

        match state {
            CircuitState::Open => return Err(Rejected::Open(self.name.clone())),
            CircuitState::HalfOpen if inner.counts.requests >= self.settings.max_requests => {
                return Err(Rejected::TooManyRequests(self.name.clone()));
            }
            _ => {}
        }

        inner.counts.on_request();
        Ok(inner.generation)
    }

    /// `success`: Some(true) success, Some(false) failure, None neutral.
    fn after_request(&self, before: u64, success: Option<bool>) {
        let mut inner = self.lock();
        let now = Instant::now();
        let state = self.current_state(&mut inner, now);
        if inner.generation != before {
            return;
        }

        match (state, success) {
            (CircuitState::Closed, Some(true)) => {
                inner.counts.on_success();
                if self.settings.ready_to_trip(&inner.counts) {
                    self.set_state(&mut inner, CircuitState::Open, now);
                }
            }
            (CircuitState::Closed, Some(false)) => {
                inner.counts.on_failure();
                if self.settings.ready_to_trip(&inner.counts) {
                    self.set_state(&mut inner, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, Some(true)) => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.settings.max_requests {
                    self.set_state(&mut inner, CircuitState::Closed, now);
                }
            }
            (CircuitState::HalfOpen, Some(false)) => {
                inner.counts.on_failure();
                self.set_state(&mut inner, CircuitState::Open, now);
            }
            (CircuitState::Closed | CircuitState::HalfOpen, None) => {
                // Neutral result: undo the request so it neither dilutes the
                // ratio nor holds a half-open trial slot.
                inner.counts.requests = inner.counts.requests.saturating_sub(1);
            }
            (CircuitState::Open, _) => {}
        }
    }

    fn current_state(&self, inner: &mut Inner, now: Instant) -> CircuitState {
        match inner.state {
            CircuitState::Closed => {
                if inner.expiry.is_some_and(|expiry| expiry <= now) {
                    self.new_generation(inner, now);
                }
            }
            CircuitState::Open => {
                if inner.expiry.is_some_and(|expiry| expiry <= now) {
                    self.set_state(inner, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
        inner.state
    }

    fn set_state(&self, inner: &mut Inner, state: CircuitState, now: Instant) {
        if inner.state == state {
            return;
        }
        let from = inner.state;
        inner.state = state;
        self.new_generation(inner, now);

        tracing::info!(
            name = %self.name,
            from = %from,
            to = %state,
            "Circuit breaker state changed"
        );
        metrics::record_breaker_state(&self.name, state);
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts = Counts::default();
        inner.expiry = match inner.state {
            CircuitState::Closed => (!self.settings.interval.is_zero()).then(|| now + self.settings.interval),
            CircuitState::Open => Some(now + self.settings.timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

/// An admitted call whose result is not recorded yet. Dropping it
/// unsettled (the caller's future was dropped mid-flight) reports a
/// neutral result, which hands back the request and any half-open slot.
struct Pending<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(name = %self.breaker.name, "Call dropped before completing");
            self.breaker.after_request(self.generation, None);
        }
    }
}

/// Process-wide registry of breakers, one per named dependency.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker named in `config`, creating it on first use.
    pub fn get_or_create(&self, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(config.name.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::from_config(config)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Name and current state of every registered breaker, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }
}
