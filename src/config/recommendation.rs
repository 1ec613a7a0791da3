// ABOUTME: Router, vector oracle, and strategy engine configuration types
// ABOUTME: Covers staleness window, fatigue overrides, oracle deadlines, and engine weights
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::env_or;
use pierre_coach_core::constants::{engines, oracle, router};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hybrid router settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// How long a persisted batch is served without recomputation
    pub staleness_window_secs: u64,
    /// Recommendations returned when the caller gives no limit
    pub default_limit: usize,
    /// Fatigue above which non-discovery scenarios are forced to `auto_adjust`
    pub fatigue_override_threshold: f64,
    /// Users with fewer interactions than this are served `ColdStart` only
    pub cold_start_min_interactions: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: router::STALENESS_WINDOW_SECS,
            default_limit: router::DEFAULT_LIMIT,
            fatigue_override_threshold: router::FATIGUE_OVERRIDE_THRESHOLD,
            cold_start_min_interactions: router::COLD_START_MIN_INTERACTIONS,
        }
    }
}

impl RouterConfig {
    /// Load router configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            staleness_window_secs: env_or(
                "COACH_STALENESS_WINDOW_SECS",
                defaults.staleness_window_secs,
            ),
            default_limit: env_or("COACH_DEFAULT_LIMIT", defaults.default_limit),
            fatigue_override_threshold: env_or(
                "COACH_FATIGUE_OVERRIDE_THRESHOLD",
                defaults.fatigue_override_threshold,
            ),
            cold_start_min_interactions: env_or(
                "COACH_COLD_START_MIN_INTERACTIONS",
                defaults.cold_start_min_interactions,
            ),
        }
    }

    /// Staleness window as a chrono duration for timestamp arithmetic
    #[must_use]
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.staleness_window_secs).unwrap_or(i64::MAX))
    }
}

/// Vector-similarity oracle usage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Deadline for one `embed_and_search` call
    pub timeout_millis: u64,
    /// Candidates fetched when seeding a plan
    pub seed_top_k: usize,
    /// Recent positive interactions used as content-similarity queries
    pub content_query_count: usize,
    /// Consecutive failures that open the circuit
    pub circuit_failure_threshold: u32,
    /// Seconds before an open circuit allows a probe
    pub circuit_recovery_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_millis: oracle::TIMEOUT_MILLIS,
            seed_top_k: oracle::SEED_TOP_K,
            content_query_count: oracle::CONTENT_QUERY_COUNT,
            circuit_failure_threshold: oracle::CIRCUIT_FAILURE_THRESHOLD,
            circuit_recovery_secs: oracle::CIRCUIT_RECOVERY_SECS,
        }
    }
}

impl OracleConfig {
    /// Load oracle configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_millis: env_or("COACH_ORACLE_TIMEOUT_MILLIS", defaults.timeout_millis),
            seed_top_k: env_or("COACH_ORACLE_SEED_TOP_K", defaults.seed_top_k),
            content_query_count: env_or(
                "COACH_ORACLE_CONTENT_QUERIES",
                defaults.content_query_count,
            ),
            circuit_failure_threshold: env_or(
                "COACH_ORACLE_CIRCUIT_FAILURES",
                defaults.circuit_failure_threshold,
            ),
            circuit_recovery_secs: env_or(
                "COACH_ORACLE_CIRCUIT_RECOVERY_SECS",
                defaults.circuit_recovery_secs,
            ),
        }
    }

    /// Per-call deadline
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    /// Open-circuit cool-down
    #[must_use]
    pub const fn circuit_recovery(&self) -> Duration {
        Duration::from_secs(self.circuit_recovery_secs)
    }
}

/// Strategy engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fatigue above which the bandit serves only low-intensity items
    pub bandit_fatigue_threshold: f64,
    /// Hours a trained muscle group stays excluded from the bandit
    pub overuse_window_hours: i64,
    /// Days of completions and likes counted for popularity
    pub cold_start_window_days: i64,
    /// Maximum cold-start items sharing a muscle group
    pub cold_start_group_cap: usize,
    /// Completions fed to the sequence model
    pub sequence_window: usize,
    /// Completions averaged into the graph knowledge state
    pub knowledge_state_window: usize,
    /// Content fallback weight for a shared muscle group
    pub content_same_group_weight: f64,
    /// Content fallback weight for a shared difficulty tier
    pub content_same_difficulty_weight: f64,
    /// Content fallback weight per shared tag
    pub content_tag_weight: f64,
    /// Feature-weighted penalty per level of distance
    pub level_distance_penalty: f64,
    /// Multiplier for items targeting an injured muscle group
    pub injury_multiplier: f64,
    /// Score for complementary-group picks without a sequence model
    pub sequence_fallback_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bandit_fatigue_threshold: engines::BANDIT_FATIGUE_THRESHOLD,
            overuse_window_hours: engines::OVERUSE_WINDOW_HOURS,
            cold_start_window_days: engines::COLD_START_WINDOW_DAYS,
            cold_start_group_cap: engines::COLD_START_GROUP_CAP,
            sequence_window: engines::SEQUENCE_WINDOW,
            knowledge_state_window: engines::KNOWLEDGE_STATE_WINDOW,
            content_same_group_weight: engines::CONTENT_SAME_GROUP_WEIGHT,
            content_same_difficulty_weight: engines::CONTENT_SAME_DIFFICULTY_WEIGHT,
            content_tag_weight: engines::CONTENT_TAG_WEIGHT,
            level_distance_penalty: engines::LEVEL_DISTANCE_PENALTY,
            injury_multiplier: engines::INJURY_MULTIPLIER,
            sequence_fallback_score: engines::SEQUENCE_FALLBACK_SCORE,
        }
    }
}

impl EngineConfig {
    /// Load engine configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bandit_fatigue_threshold: env_or(
                "COACH_BANDIT_FATIGUE_THRESHOLD",
                defaults.bandit_fatigue_threshold,
            ),
            overuse_window_hours: env_or(
                "COACH_OVERUSE_WINDOW_HOURS",
                defaults.overuse_window_hours,
            ),
            cold_start_window_days: env_or(
                "COACH_COLD_START_WINDOW_DAYS",
                defaults.cold_start_window_days,
            ),
            cold_start_group_cap: env_or(
                "COACH_COLD_START_GROUP_CAP",
                defaults.cold_start_group_cap,
            ),
            sequence_window: env_or("COACH_SEQUENCE_WINDOW", defaults.sequence_window),
            knowledge_state_window: env_or(
                "COACH_KNOWLEDGE_STATE_WINDOW",
                defaults.knowledge_state_window,
            ),
            content_same_group_weight: env_or(
                "COACH_CONTENT_SAME_GROUP_WEIGHT",
                defaults.content_same_group_weight,
            ),
            content_same_difficulty_weight: env_or(
                "COACH_CONTENT_SAME_DIFFICULTY_WEIGHT",
                defaults.content_same_difficulty_weight,
            ),
            content_tag_weight: env_or("COACH_CONTENT_TAG_WEIGHT", defaults.content_tag_weight),
            level_distance_penalty: env_or(
                "COACH_LEVEL_DISTANCE_PENALTY",
                defaults.level_distance_penalty,
            ),
            injury_multiplier: env_or("COACH_INJURY_MULTIPLIER", defaults.injury_multiplier),
            sequence_fallback_score: env_or(
                "COACH_SEQUENCE_FALLBACK_SCORE",
                defaults.sequence_fallback_score,
            ),
        }
    }

    /// Overuse protection window
    #[must_use]
    pub fn overuse_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.overuse_window_hours)
    }

    /// Popularity window
    #[must_use]
    pub fn cold_start_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.cold_start_window_days)
    }
}
