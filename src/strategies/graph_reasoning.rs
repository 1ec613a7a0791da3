// ABOUTME: Graph reasoning engine scoring unlocked items against a knowledge-state embedding
// ABOUTME: Users without completions get entry points ranked by how much they unlock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem};
use crate::catalog::graph::cosine_similarity;
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use crate::inference::ModelRegistry;
use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{ItemId, StrategyKind};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Next skills reachable from what the user already completed
pub struct GraphReasoning {
    registry: Arc<ModelRegistry>,
    config: EngineConfig,
}

impl GraphReasoning {
    /// Engine embedding the catalog with the registry's graph model
    #[must_use]
    pub const fn new(registry: Arc<ModelRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Items without prerequisites, scored by their share of the largest unlock count
    fn entry_points(catalog: &CatalogGraph, done: &HashSet<ItemId>) -> Vec<ScoredItem> {
        let entries: Vec<_> = catalog
            .entry_points()
            .into_iter()
            .filter(|item| !done.contains(&item.id))
            .map(|item| (item.id, catalog.unlocks_of(item.id).len()))
            .collect();
        let max_unlocks = entries.iter().map(|(_, n)| *n).max().unwrap_or(0);
        entries
            .into_iter()
            .map(|(id, unlocks)| {
                let score = if max_unlocks == 0 {
                    0.0
                } else {
                    unlocks as f64 / max_unlocks as f64
                };
                ScoredItem::new(id, score)
            })
            .collect()
    }
}

#[async_trait]
impl RecommendationStrategy for GraphReasoning {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GraphReasoning
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        let done = ctx.completed_set();
        if done.is_empty() {
            return Ok(rank(Self::entry_points(catalog, &done), limit));
        }

        let embeddings = self.registry.graph().embed(catalog)?;
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }
        let recent = ctx.recent_completed(self.config.knowledge_state_window);
        let Some(knowledge) = embeddings.mean_of(&recent) else {
            return Ok(rank(Self::entry_points(catalog, &done), limit));
        };

        let frontier: BTreeSet<ItemId> = done
            .iter()
            .flat_map(|id| catalog.unlocks_of(*id).iter().copied())
            .filter(|id| !done.contains(id))
            .filter(|id| {
                catalog
                    .prerequisites_of(*id)
                    .iter()
                    .all(|prereq| done.contains(prereq))
            })
            .collect();

        let scored: Vec<ScoredItem> = frontier
            .into_iter()
            .filter_map(|id| {
                embeddings.get(id).map(|embedding| {
                    let cosine = cosine_similarity(knowledge.view(), embedding);
                    ScoredItem::new(id, f64::midpoint(cosine, 1.0))
                })
            })
            .collect();

        debug!(
            user_id = %ctx.profile.user_id,
            completed = done.len(),
            frontier = scored.len(),
            "Graph reasoning scored"
        );
        Ok(rank(scored, limit))
    }
}
