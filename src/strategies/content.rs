// ABOUTME: Content similarity engine built on the vector oracle with a rule-based fallback
// ABOUTME: Queries neighbours of recently liked items within the same muscle group
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem};
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use crate::oracle::{GuardedOracle, OracleFilter};
use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{CatalogItem, ItemId, StrategyKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Nearest neighbours of the user's last positive interactions
pub struct ContentSimilarity {
    oracle: Arc<GuardedOracle>,
    query_count: usize,
    config: EngineConfig,
}

impl ContentSimilarity {
    /// Engine asking `oracle` about the last `query_count` liked items
    #[must_use]
    pub fn new(oracle: Arc<GuardedOracle>, query_count: usize, config: EngineConfig) -> Self {
        Self {
            oracle,
            query_count,
            config,
        }
    }

    /// Deterministic similarity used when the oracle cannot answer, 0..=1
    #[must_use]
    pub fn rule_score(&self, seed: &CatalogItem, candidate: &CatalogItem) -> f64 {
        let mut score = 0.0;
        if seed.muscle_group == candidate.muscle_group {
            score += self.config.content_same_group_weight;
        }
        if seed.difficulty_tier == candidate.difficulty_tier {
            score += self.config.content_same_difficulty_weight;
        }
        score += self.config.content_tag_weight * seed.tag_overlap(candidate) as f64;
        score.clamp(0.0, 1.0)
    }

    fn fallback_scores(&self, catalog: &CatalogGraph, seed: &CatalogItem) -> Vec<ScoredItem> {
        catalog
            .items()
            .iter()
            .filter(|candidate| candidate.muscle_group == seed.muscle_group)
            .map(|candidate| ScoredItem::new(candidate.id, self.rule_score(seed, candidate)))
            .collect()
    }
}

#[async_trait]
impl RecommendationStrategy for ContentSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContentSimilarity
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        let seeds: Vec<&CatalogItem> = ctx
            .recent_positive(self.query_count)
            .into_iter()
            .filter_map(|id| catalog.get(id))
            .collect();
        if seeds.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let seed_ids: HashSet<ItemId> = seeds.iter().map(|seed| seed.id).collect();

        let mut best: HashMap<ItemId, f64> = HashMap::new();
        for seed in &seeds {
            let k = limit + seeds.len();
            let scored = match self
                .oracle
                .search(
                    &seed.semantic_document(),
                    k,
                    Some(OracleFilter::muscle(seed.muscle_group)),
                )
                .await
            {
                Ok(hits) => hits
                    .into_iter()
                    .filter(|hit| {
                        catalog
                            .get(hit.item_id)
                            .is_some_and(|item| item.muscle_group == seed.muscle_group)
                    })
                    .map(|hit| ScoredItem::new(hit.item_id, hit.similarity()))
                    .collect(),
                Err(error) => {
                    warn!(
                        user_id = %ctx.profile.user_id,
                        seed = %seed.id,
                        %error,
                        "Content oracle unavailable, using rule-based similarity"
                    );
                    self.fallback_scores(catalog, seed)
                }
            };

            for item in scored {
                if seed_ids.contains(&item.item_id) {
                    continue;
                }
                best.entry(item.item_id)
                    .and_modify(|score| *score = score.max(item.score))
                    .or_insert(item.score);
            }
        }

        debug!(
            user_id = %ctx.profile.user_id,
            seeds = seeds.len(),
            candidates = best.len(),
            "Content similarity scored"
        );
        Ok(rank(
            best.into_iter()
                .map(|(item_id, score)| ScoredItem::new(item_id, score))
                .collect(),
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pierre_coach_core::models::{DifficultyTier, Equipment, MuscleGroup};
    use std::collections::BTreeSet;

    fn item(id: u64, group: MuscleGroup, tier: DifficultyTier, tags: &[&str]) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            name: format!("item {id}"),
            muscle_group: group,
            equipment: Equipment::Dumbbell,
            difficulty_tier: tier,
            numeric_level: 1,
            tags: tags.iter().map(|t| (*t).to_owned()).collect::<BTreeSet<_>>(),
            calorie_rate: 5.0,
            description: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_rule_score_is_bounded() {
        let tags = ["a", "b", "c", "d", "e", "f", "g"];
        let seed = item(1, MuscleGroup::Chest, DifficultyTier::Beginner, &tags);
        let twin = item(2, MuscleGroup::Chest, DifficultyTier::Beginner, &tags);
        let stranger = item(3, MuscleGroup::Legs, DifficultyTier::Advanced, &[]);

        let oracle = Arc::new(GuardedOracle::new(
            Arc::new(crate::oracle::KeywordOracle::new(&[])),
            &crate::config::OracleConfig::default(),
        ));
        let engine = ContentSimilarity::new(oracle, 3, EngineConfig::default());

        assert!((engine.rule_score(&seed, &twin) - 1.0).abs() < f64::EPSILON);
        assert!(engine.rule_score(&seed, &stranger).abs() < f64::EPSILON);

        let partial = item(4, MuscleGroup::Chest, DifficultyTier::Advanced, &["a"]);
        assert!((engine.rule_score(&seed, &partial) - 0.6).abs() < 1e-9);
    }
}
