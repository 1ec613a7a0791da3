// ABOUTME: Chain planner and model registry configuration types
// ABOUTME: Follow probability, per-tier set/rep targets, weight directory, and skill-gate depth
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::env_or;
use pierre_coach_core::constants::{models, planner};
use pierre_coach_core::models::DifficultyTier;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Chain planner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Probability of following the strongest transition edge
    pub follow_probability: f64,
    /// Plan length when the caller gives none
    pub default_plan_length: usize,
    /// Sessions between transition probability recomputations
    pub transition_recompute_every: u64,
    /// Sets for intermediate items
    pub default_sets: u32,
    /// Reps for intermediate items
    pub default_reps: u32,
    /// Sets for beginner items
    pub beginner_sets: u32,
    /// Reps for beginner items
    pub beginner_reps: u32,
    /// Sets for advanced items
    pub advanced_sets: u32,
    /// Reps for advanced items
    pub advanced_reps: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            follow_probability: planner::FOLLOW_PROBABILITY,
            default_plan_length: planner::DEFAULT_PLAN_LENGTH,
            transition_recompute_every: planner::TRANSITION_RECOMPUTE_EVERY,
            default_sets: planner::DEFAULT_SETS,
            default_reps: planner::DEFAULT_REPS,
            beginner_sets: planner::BEGINNER_SETS,
            beginner_reps: planner::BEGINNER_REPS,
            advanced_sets: planner::ADVANCED_SETS,
            advanced_reps: planner::ADVANCED_REPS,
        }
    }
}

impl PlannerConfig {
    /// Load planner configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            follow_probability: env_or("COACH_FOLLOW_PROBABILITY", defaults.follow_probability),
            default_plan_length: env_or("COACH_PLAN_LENGTH", defaults.default_plan_length),
            transition_recompute_every: env_or(
                "COACH_TRANSITION_RECOMPUTE_EVERY",
                defaults.transition_recompute_every,
            ),
            default_sets: env_or("COACH_DEFAULT_SETS", defaults.default_sets),
            default_reps: env_or("COACH_DEFAULT_REPS", defaults.default_reps),
            beginner_sets: env_or("COACH_BEGINNER_SETS", defaults.beginner_sets),
            beginner_reps: env_or("COACH_BEGINNER_REPS", defaults.beginner_reps),
            advanced_sets: env_or("COACH_ADVANCED_SETS", defaults.advanced_sets),
            advanced_reps: env_or("COACH_ADVANCED_REPS", defaults.advanced_reps),
        }
    }

    /// (sets, reps) for an item of the given tier
    #[must_use]
    pub const fn volume_for(&self, tier: DifficultyTier) -> (u32, u32) {
        match tier {
            DifficultyTier::Beginner => (self.beginner_sets, self.beginner_reps),
            DifficultyTier::Intermediate => (self.default_sets, self.default_reps),
            DifficultyTier::Advanced => (self.advanced_sets, self.advanced_reps),
        }
    }
}

/// Model registry and skill-gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding `sequence_model.json` and `graph_model.json`
    pub weights_dir: PathBuf,
    /// Width of graph embeddings
    pub graph_embedding_dim: usize,
    /// Seed for random weight initialization
    pub random_init_seed: u64,
    /// Maximum prerequisite hops in one skill-gate walk
    pub skill_gate_max_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_dir: PathBuf::from(models::DEFAULT_WEIGHTS_DIR),
            graph_embedding_dim: models::GRAPH_EMBEDDING_DIM,
            random_init_seed: models::RANDOM_INIT_SEED,
            skill_gate_max_depth: planner::SKILL_GATE_MAX_DEPTH,
        }
    }
}

impl ModelConfig {
    /// Load model configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weights_dir: env::var("COACH_WEIGHTS_DIR").map_or(defaults.weights_dir, PathBuf::from),
            graph_embedding_dim: env_or(
                "COACH_GRAPH_EMBEDDING_DIM",
                defaults.graph_embedding_dim,
            ),
            random_init_seed: env_or("COACH_RANDOM_INIT_SEED", defaults.random_init_seed),
            skill_gate_max_depth: env_or(
                "COACH_SKILL_GATE_MAX_DEPTH",
                defaults.skill_gate_max_depth,
            ),
        }
    }
}
