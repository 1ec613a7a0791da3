// ABOUTME: Configuration management for the coaching engine loaded from COACH_* environment variables
// ABOUTME: Composes router, oracle, engine, planner, and model settings with validated defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for Pierre Coach
//!
//! - **Recommendation**: router staleness window and overrides, oracle deadlines,
//!   per-engine tuning
//! - **Planning**: chain planner follow probability and volume targets, model
//!   weight locations and the skill-gate bound
//!
//! Every struct has a `Default` built from `pierre_coach_core::constants` and a
//! `from_env()` constructor that falls back to that default per field.

use pierre_coach_core::errors::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::debug;

/// Chain planner and model registry settings
pub mod planning;
/// Router, oracle, and engine settings
pub mod recommendation;

pub use planning::{ModelConfig, PlannerConfig};
pub use recommendation::{EngineConfig, OracleConfig, RouterConfig};

/// Parse an environment variable, falling back to `default` when unset or malformed
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Hybrid router settings
    #[serde(default)]
    pub router: RouterConfig,
    /// Vector oracle usage
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Strategy engine tuning
    #[serde(default)]
    pub engines: EngineConfig,
    /// Chain planner settings
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Model registry settings
    #[serde(default)]
    pub models: ModelConfig,
}

impl CoachConfig {
    /// Load the full configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting values are inconsistent
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            router: RouterConfig::from_env(),
            oracle: OracleConfig::from_env(),
            engines: EngineConfig::from_env(),
            planner: PlannerConfig::from_env(),
            models: ModelConfig::from_env(),
        };
        config.validate()?;
        debug!(?config, "Loaded coach configuration");
        Ok(config)
    }

    /// Check value ranges that would otherwise surface as odd rankings
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the offending setting
    pub fn validate(&self) -> AppResult<()> {
        let unit = |name: &str, value: f64| -> AppResult<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(AppError::new(
                    ErrorCode::ConfigInvalid,
                    format!("{name} must be within 0..=1, got {value}"),
                ))
            }
        };

        unit("planner.follow_probability", self.planner.follow_probability)?;
        unit(
            "router.fatigue_override_threshold",
            self.router.fatigue_override_threshold,
        )?;
        unit(
            "engines.bandit_fatigue_threshold",
            self.engines.bandit_fatigue_threshold,
        )?;
        unit("engines.injury_multiplier", self.engines.injury_multiplier)?;

        if self.router.default_limit == 0 {
            return Err(AppError::new(
                ErrorCode::ConfigInvalid,
                "router.default_limit must be positive",
            ));
        }
        if self.oracle.timeout_millis == 0 {
            return Err(AppError::new(
                ErrorCode::ConfigInvalid,
                "oracle.timeout_millis must be positive",
            ));
        }
        if self.models.skill_gate_max_depth == 0 {
            return Err(AppError::new(
                ErrorCode::ConfigInvalid,
                "models.skill_gate_max_depth must be positive",
            ));
        }
        Ok(())
    }
}
