// ABOUTME: Deadline and circuit-breaker wrapper around a vector-similarity oracle
// ABOUTME: Converts timeouts and backend errors into recoverable recommendation errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{CircuitBreaker, CircuitBreakerConfig, OracleFilter, OracleHit, VectorOracle};
use crate::config::OracleConfig;
use pierre_coach_core::errors::RecommendationError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Oracle handle shared by engines and the chain planner
///
/// Every call is bounded by the configured deadline. Consecutive failures
/// open a circuit so a dead backend costs nothing until it recovers.
pub struct GuardedOracle {
    inner: Arc<dyn VectorOracle>,
    deadline: Duration,
    breaker: CircuitBreaker,
}

impl GuardedOracle {
    /// Wrap an oracle with the configured deadline and breaker thresholds
    #[must_use]
    pub fn new(inner: Arc<dyn VectorOracle>, config: &OracleConfig) -> Self {
        let breaker = CircuitBreaker::new(
            inner.name(),
            CircuitBreakerConfig {
                failure_threshold: config.circuit_failure_threshold,
                recovery_timeout: config.circuit_recovery(),
            },
        );
        Self {
            inner,
            deadline: config.timeout(),
            breaker,
        }
    }

    /// Breaker state, for diagnostics
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Deadline applied to every call
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Search with deadline and circuit protection
    ///
    /// # Errors
    ///
    /// `OracleTimeout` when the deadline elapses, `OracleError` when the
    /// backend fails or the circuit is open
    pub async fn search(
        &self,
        text: &str,
        k: usize,
        filter: Option<OracleFilter>,
    ) -> Result<Vec<OracleHit>, RecommendationError> {
        if !self.breaker.is_allowed() {
            return Err(RecommendationError::OracleError {
                message: format!(
                    "{} circuit open, retry in {}s",
                    self.inner.name(),
                    self.breaker.retry_after_secs()
                ),
            });
        }

        match timeout(self.deadline, self.inner.embed_and_search(text, k, filter)).await {
            Ok(Ok(hits)) => {
                self.breaker.record_success();
                debug!(oracle = self.inner.name(), hits = hits.len(), "Oracle answered");
                Ok(hits)
            }
            Ok(Err(error)) => {
                self.breaker.record_failure();
                warn!(oracle = self.inner.name(), %error, "Oracle call failed");
                Err(error)
            }
            Err(_) => {
                self.breaker.record_failure();
                warn!(
                    oracle = self.inner.name(),
                    deadline_ms = self.deadline.as_millis(),
                    "Oracle call timed out"
                );
                Err(RecommendationError::OracleTimeout {
                    elapsed: self.deadline,
                })
            }
        }
    }
}
