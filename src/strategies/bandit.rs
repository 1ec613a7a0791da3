// ABOUTME: Adaptive bandit engine sampling Beta posteriors per catalog item
// ABOUTME: Serves only low-intensity work under heavy fatigue and skips overused muscle groups
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem, SharedRng};
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{
    ArmCounts, CatalogItem, InteractionKind, MuscleGroup, StrategyKind,
};
use rand::Rng;
use rand_distr::{Beta, Distribution};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Draw one sample from the arm's posterior, 0..=1
///
/// Parameters are always at least 1, so the distribution is well formed;
/// the posterior mean is returned if construction fails anyway.
pub fn sample_arm<R: Rng + ?Sized>(arm: ArmCounts, rng: &mut R) -> f64 {
    let (alpha, beta) = (arm.alpha(), arm.beta());
    Beta::new(alpha, beta).map_or(alpha / (alpha + beta), |dist| dist.sample(rng))
}

/// Damping for items far from the user's intensity target, 0..=1
#[must_use]
pub fn intensity_attenuation(item: &CatalogItem, target: f64) -> f64 {
    1.0 / 0.1f64.mul_add((item.intensity() - target).abs(), 1.0)
}

/// Thompson-sampling bandit over catalog items
pub struct AdaptiveBandit {
    rng: Arc<SharedRng>,
    config: EngineConfig,
}

impl AdaptiveBandit {
    /// Bandit drawing from the shared generator
    #[must_use]
    pub const fn new(rng: Arc<SharedRng>, config: EngineConfig) -> Self {
        Self { rng, config }
    }

    fn overused_groups(&self, catalog: &CatalogGraph, ctx: &RecommendationContext) -> HashSet<MuscleGroup> {
        let window = self.config.overuse_window();
        let mut groups: HashSet<MuscleGroup> = MuscleGroup::ALL
            .into_iter()
            .filter(|group| ctx.state.trained_within(*group, ctx.now, window))
            .collect();
        groups.extend(
            ctx.history
                .iter()
                .filter(|event| {
                    event.kind == InteractionKind::Finish && ctx.now - event.timestamp <= window
                })
                .filter_map(|event| catalog.get(event.item_id))
                .map(|item| item.muscle_group),
        );
        groups
    }
}

#[async_trait]
impl RecommendationStrategy for AdaptiveBandit {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdaptiveBandit
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        if ctx.state.fatigue_level > self.config.bandit_fatigue_threshold {
            debug!(
                user_id = %ctx.profile.user_id,
                fatigue = ctx.state.fatigue_level,
                "Fatigue short-circuit: low-intensity items only"
            );
            let recovery = catalog
                .items()
                .iter()
                .filter(|item| item.is_low_intensity())
                .map(|item| ScoredItem::new(item.id, 1.0))
                .collect();
            return Ok(rank(recovery, limit));
        }

        let overused = self.overused_groups(catalog, ctx);
        let target = ctx.state.target_intensity;
        let sampled = self.rng.with(|rng| {
            catalog
                .items()
                .iter()
                .filter(|item| !overused.contains(&item.muscle_group))
                .map(|item| {
                    let arm = ctx.arms.get(&item.id).copied().unwrap_or_default();
                    let score = sample_arm(arm, rng) * intensity_attenuation(item, target);
                    ScoredItem::new(item.id, score)
                })
                .collect::<Vec<_>>()
        });

        debug!(
            user_id = %ctx.profile.user_id,
            arms = sampled.len(),
            excluded_groups = overused.len(),
            "Bandit sampled"
        );
        Ok(rank(sampled, limit))
    }
}
