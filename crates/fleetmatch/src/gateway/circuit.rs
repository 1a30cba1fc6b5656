//! Per-provider circuit breaker.
//!
//! Closed until `failure_threshold` consecutive failed calls, then Open. The
//! Open state is left lazily: once `cooldown` has elapsed since the last failure
//! a single probe is admitted. The probe refreshes the timestamp so concurrent
//! callers keep seeing an open circuit until it resolves.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

/// Externally visible position of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
    /// Cooldown elapsed; the next call is a probe.
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitState {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
}

/// Decision for one incoming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Closed,
    Probe,
    Rejected,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    settings: CircuitSettings,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(settings: CircuitSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(CircuitState::default()),
        }
    }

    fn is_tripped(&self, state: &CircuitState) -> bool {
        state.consecutive_failures >= self.settings.failure_threshold
    }

    fn cooled_down(&self, state: &CircuitState, now: Instant) -> bool {
        match state.last_failure_at {
            Some(at) => now.saturating_duration_since(at) > self.settings.cooldown,
            None => true,
        }
    }

    pub fn admit(&self, now: Instant) -> Admission {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_tripped(&state) {
            return Admission::Closed;
        }

        if self.cooled_down(&state, now) {
            state.last_failure_at = Some(now);
            Admission::Probe
        } else {
            Admission::Rejected
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = CircuitState::default();
    }

    /// Returns `true` when this failure leaves the circuit open.
    pub fn record_failure(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure_at = Some(now);
        self.is_tripped(&state)
    }

    pub fn status(&self, now: Instant) -> CircuitStatus {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_tripped(&state) {
            CircuitStatus::Closed
        } else if self.cooled_down(&state, now) {
            CircuitStatus::HalfOpen
        } else {
            CircuitStatus::Open
        }
    }

    pub fn snapshot(&self) -> CircuitState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
