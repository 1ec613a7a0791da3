// ABOUTME: Feature-weighted engine mapping body-profile features onto item preference axes
// ABOUTME: Expert weight matrix, level-distance penalty, and injury suppression
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem};
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{CatalogItem, StrategyKind, UserProfile};
use rayon::prelude::*;

/// Rows: isolation, strength, burn. Columns: BMI, tier, gender, age.
///
/// Each row sums to one so preferences stay in 0..=1.
const PREFERENCE_WEIGHTS: [[f64; 4]; 3] = [
    [0.10, 0.50, 0.15, 0.25],
    [0.15, 0.45, 0.30, 0.10],
    [0.60, 0.10, 0.10, 0.20],
];

/// Project profile features onto the isolation / strength / burn axes
#[must_use]
pub fn preference_vector(profile: &UserProfile) -> [f64; 3] {
    let features = profile.feature_vector();
    PREFERENCE_WEIGHTS.map(|row| {
        row.iter()
            .zip(features.iter())
            .map(|(weight, feature)| weight * feature)
            .sum::<f64>()
    })
}

/// Scores every item from the user's body profile alone
pub struct FeatureWeighted {
    config: EngineConfig,
}

impl FeatureWeighted {
    /// Engine with the given penalty and injury settings
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Score of one item for the given preference vector, 0..=1
    #[must_use]
    pub fn score(&self, profile: &UserProfile, preference: &[f64; 3], item: &CatalogItem) -> f64 {
        let axes = item.preference_axes();
        let affinity = preference
            .iter()
            .zip(axes.iter())
            .map(|(p, a)| p * a)
            .sum::<f64>()
            / axes.len() as f64;
        let distance = f64::from(profile.skill_level.abs_diff(item.numeric_level));
        let mut score = self.config.level_distance_penalty.mul_add(-distance, affinity);
        if profile.mentions_injury(item.muscle_group) {
            score *= self.config.injury_multiplier;
        }
        score.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl RecommendationStrategy for FeatureWeighted {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FeatureWeighted
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        let preference = preference_vector(&ctx.profile);
        let scored: Vec<ScoredItem> = catalog
            .items()
            .par_iter()
            .map(|item| ScoredItem::new(item.id, self.score(&ctx.profile, &preference, item)))
            .collect();
        Ok(rank(scored, limit))
    }
}
