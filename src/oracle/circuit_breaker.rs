// ABOUTME: Circuit breaker guarding the vector-similarity oracle
// ABOUTME: Fails fast after consecutive errors or timeouts and probes recovery after a cool-down
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_coach_core::constants::oracle;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are refused without reaching the oracle
    Open,
    /// One probe call is in flight
    HalfOpen,
}

impl CircuitState {
    const fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u32(self) -> u32 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Thresholds for the breaker
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before a probe is allowed
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: oracle::CIRCUIT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(oracle::CIRCUIT_RECOVERY_SECS),
        }
    }
}

/// Lock-free breaker shared by every engine calling the same oracle
#[derive(Debug)]
pub struct CircuitBreaker {
    service: &'static str,
    state: AtomicU32,
    failure_count: AtomicU32,
    opened_at_ms: AtomicU64,
    config: CircuitBreakerConfig,
    start: Instant,
}

impl CircuitBreaker {
    /// Closed breaker for the named service
    #[must_use]
    pub fn new(service: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            service,
            state: AtomicU32::new(CircuitState::Closed.to_u32()),
            failure_count: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            config,
            start: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u32(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures counted while closed
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Whether a call may go out now; may move an expired open circuit to half-open
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => self.try_half_open(),
            CircuitState::HalfOpen => false,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn recovery_ms(&self) -> u64 {
        u64::try_from(self.config.recovery_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn try_half_open(&self) -> bool {
        let since_open = self
            .elapsed_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst));
        if since_open < self.recovery_ms() {
            return false;
        }
        let moved = self
            .state
            .compare_exchange(
                CircuitState::Open.to_u32(),
                CircuitState::HalfOpen.to_u32(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if moved {
            info!(service = self.service, "Oracle circuit half-open, probing");
        }
        moved
    }

    /// Seconds until an open circuit admits a probe
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let since_open = self
            .elapsed_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst));
        self.recovery_ms()
            .saturating_sub(since_open)
            .saturating_add(999)
            / 1000
    }

    /// Record a successful call
    pub fn record_success(&self) {
        if self.state() == CircuitState::HalfOpen {
            info!(service = self.service, "Oracle circuit closed, service recovered");
        }
        self.state
            .store(CircuitState::Closed.to_u32(), Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
    }

    /// Record a failed or timed-out call
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        service = self.service,
                        failures = count,
                        recovery_secs = self.config.recovery_timeout.as_secs(),
                        "Oracle circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!(service = self.service, "Oracle probe failed, circuit re-opened");
            }
            CircuitState::Open => {
                self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
            }
        }
    }

    fn open(&self) {
        self.state.store(CircuitState::Open.to_u32(), Ordering::SeqCst);
        self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
    }

    /// Force the circuit closed
    pub fn reset(&self) {
        self.state
            .store(CircuitState::Closed.to_u32(), Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold_and_recovers() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::ZERO,
            },
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.is_allowed());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_open_circuit_refuses_until_timeout() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_secs(60),
            },
        );
        breaker.record_failure();
        assert!(!breaker.is_allowed());
        assert!(breaker.retry_after_secs() > 0);
    }
}
