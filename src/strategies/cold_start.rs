// ABOUTME: Cold-start engine ranking recent popularity with a per-muscle-group diversity cap
// ABOUTME: Backfills from goal-tagged items, then uniformly at random, within the user's tier
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{rank, RecommendationContext, RecommendationStrategy, ScoredItem, SharedRng};
use crate::catalog::CatalogGraph;
use crate::config::EngineConfig;
use crate::ledger::InteractionLedger;
use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{CatalogItem, InteractionKind, ItemId, MuscleGroup, StrategyKind};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

const GOAL_SCORE: f64 = 0.3;
const RANDOM_SCORE: f64 = 0.2;
const OVERFLOW_SCORE: f64 = 0.1;

/// Fills the batch greedily while tracking picks per muscle group
struct CappedPicker {
    cap: usize,
    limit: usize,
    per_group: HashMap<MuscleGroup, usize>,
    taken: HashSet<ItemId>,
    picks: Vec<ScoredItem>,
}

impl CappedPicker {
    fn new(cap: usize, limit: usize) -> Self {
        Self {
            cap,
            limit,
            per_group: HashMap::new(),
            taken: HashSet::new(),
            picks: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.picks.len() >= self.limit
    }

    /// Take the item unless it is a repeat or, when `capped`, its group is full
    fn offer(&mut self, item: &CatalogItem, score: f64, capped: bool) {
        if self.is_full() || self.taken.contains(&item.id) {
            return;
        }
        let count = self.per_group.entry(item.muscle_group).or_default();
        if capped && *count >= self.cap {
            return;
        }
        *count += 1;
        self.taken.insert(item.id);
        self.picks.push(ScoredItem::new(item.id, score));
    }
}

/// Popular, level-appropriate, diverse picks for users without history
pub struct ColdStart {
    ledger: Arc<dyn InteractionLedger>,
    rng: Arc<SharedRng>,
    config: EngineConfig,
}

impl ColdStart {
    /// Engine reading popularity from the shared ledger
    #[must_use]
    pub fn new(ledger: Arc<dyn InteractionLedger>, rng: Arc<SharedRng>, config: EngineConfig) -> Self {
        Self {
            ledger,
            rng,
            config,
        }
    }
}

#[async_trait]
impl RecommendationStrategy for ColdStart {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ColdStart
    }

    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        let eligible: Vec<&CatalogItem> = catalog
            .items()
            .iter()
            .filter(|item| item.difficulty_tier <= ctx.profile.fitness_level)
            .collect();
        if eligible.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let since = ctx.now - self.config.cold_start_window();
        let popularity = self
            .ledger
            .aggregate_by_item(&[InteractionKind::Finish, InteractionKind::Like], since)
            .await?;

        let mut popular: Vec<(&CatalogItem, u64)> = eligible
            .iter()
            .filter_map(|item| {
                popularity
                    .get(&item.id)
                    .filter(|engagement| engagement.count > 0)
                    .map(|engagement| (*item, engagement.count))
            })
            .collect();
        popular.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        let max_count = popular.first().map_or(1, |(_, count)| *count) as f64;

        let mut picker = CappedPicker::new(self.config.cold_start_group_cap, limit);
        for (item, count) in &popular {
            picker.offer(item, 0.5f64.mul_add(*count as f64 / max_count, 0.5), true);
        }

        let goal = ctx.profile.goal.tag();
        let (mut goal_matches, mut others): (Vec<&CatalogItem>, Vec<&CatalogItem>) =
            eligible.iter().copied().partition(|item| item.has_tag(goal));
        self.rng.with(|rng| {
            goal_matches.shuffle(rng);
            others.shuffle(rng);
        });

        for item in &goal_matches {
            picker.offer(item, GOAL_SCORE, true);
        }
        for item in &others {
            picker.offer(item, RANDOM_SCORE, true);
        }
        for item in goal_matches.iter().chain(others.iter()) {
            picker.offer(item, OVERFLOW_SCORE, false);
        }

        debug!(
            user_id = %ctx.profile.user_id,
            eligible = eligible.len(),
            popular = popular.len(),
            picked = picker.picks.len(),
            "Cold start ranked"
        );
        Ok(rank(picker.picks, limit))
    }
}
