// ABOUTME: Sequence prediction engine over the user's most recent completions
// ABOUTME: Falls back to a complementary-muscle-group table when no model is loaded
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem};
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use crate::inference::ModelRegistry;
use async_trait::async_trait;
use pierre_coach_core::errors::{AppResult, RecommendationError};
use pierre_coach_core::models::{ItemId, StrategyKind};
use std::sync::Arc;
use tracing::warn;

/// Predicts the next exercise from recent completions
pub struct SequencePrediction {
    registry: Arc<ModelRegistry>,
    config: EngineConfig,
}

impl SequencePrediction {
    /// Engine backed by the shared model registry
    #[must_use]
    pub const fn new(registry: Arc<ModelRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    fn complementary(&self, catalog: &CatalogGraph, last: ItemId, limit: usize) -> Vec<ScoredItem> {
        let Some(last_item) = catalog.get(last) else {
            return Vec::new();
        };
        let target = last_item.muscle_group.complement();
        let picks = catalog
            .items()
            .iter()
            .filter(|item| item.muscle_group == target)
            .map(|item| ScoredItem::new(item.id, self.config.sequence_fallback_score))
            .collect();
        rank(picks, limit)
    }
}

#[async_trait]
impl RecommendationStrategy for SequencePrediction {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SequencePrediction
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        let recent = ctx.recent_completed(self.config.sequence_window);
        let Some(&last) = recent.last() else {
            return Err(RecommendationError::DataUnavailable {
                reason: "no completed exercises".to_owned(),
            }
            .into());
        };

        match self.registry.predict_next(&recent, limit) {
            Ok(predictions) if !predictions.is_empty() => Ok(rank(
                predictions
                    .into_iter()
                    .filter(|(id, _)| catalog.get(*id).is_some())
                    .map(|(id, probability)| ScoredItem::new(id, probability))
                    .collect(),
                limit,
            )),
            Ok(_) => Ok(self.complementary(catalog, last, limit)),
            Err(error) => {
                warn!(
                    user_id = %ctx.profile.user_id,
                    %error,
                    "Sequence model unavailable, using complementary muscle groups"
                );
                Ok(self.complementary(catalog, last, limit))
            }
        }
    }
}
