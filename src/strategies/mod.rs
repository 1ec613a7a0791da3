// ABOUTME: Strategy engine contract, per-request user context, and shared ranking helpers
// ABOUTME: Six engines score catalog items for a user; the router decides which ones run
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Strategy Engines
//!
//! Every engine implements [`RecommendationStrategy`] and returns at most
//! `limit` items ordered by score (higher is better), ties broken by catalog
//! id. An engine with nothing to say returns an empty list rather than an
//! error; errors are reserved for failing stores.

/// Beta-sampling bandit with fatigue and overuse protection
pub mod bandit;
/// Popularity with a per-muscle-group diversity cap
pub mod cold_start;
/// Nearest neighbours of recently liked items
pub mod content;
/// Expert-weighted body-profile preferences
pub mod feature_weighted;
/// Prerequisite-graph knowledge state
pub mod graph_reasoning;
/// Next-item prediction from recent completions
pub mod sequence;

pub use bandit::AdaptiveBandit;
pub use cold_start::ColdStart;
pub use content::ContentSimilarity;
pub use feature_weighted::FeatureWeighted;
pub use graph_reasoning::GraphReasoning;
pub use sequence::SequencePrediction;

use crate::catalog::CatalogGraph;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{
    ArmCounts, InteractionEvent, InteractionKind, ItemId, StrategyKind, UserProfile, UserState,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// An item with an engine score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// Scored catalog item
    pub item_id: ItemId,
    /// Roughly 0..=1, higher is better
    pub score: f64,
}

impl ScoredItem {
    /// Pair an item with a score
    #[must_use]
    pub const fn new(item_id: ItemId, score: f64) -> Self {
        Self { item_id, score }
    }
}

/// Sort by score descending then id ascending, and keep the first `limit`
#[must_use]
pub fn rank(mut items: Vec<ScoredItem>, limit: usize) -> Vec<ScoredItem> {
    items.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    items.truncate(limit);
    items
}

/// Everything an engine may know about the requesting user
#[derive(Debug, Clone)]
pub struct RecommendationContext {
    /// Body profile
    pub profile: UserProfile,
    /// Fatigue, intensity target, recent groups
    pub state: UserState,
    /// The user's ledger events, oldest first
    pub history: Vec<InteractionEvent>,
    /// Bandit tallies per item
    pub arms: HashMap<ItemId, ArmCounts>,
    /// Request time
    pub now: DateTime<Utc>,
}

impl RecommendationContext {
    /// Context for a user with no ledger history
    #[must_use]
    pub fn new(profile: UserProfile, state: UserState, now: DateTime<Utc>) -> Self {
        Self {
            profile,
            state,
            history: Vec::new(),
            arms: HashMap::new(),
            now,
        }
    }

    /// Whether the ledger has anything for this user
    #[must_use]
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Completed items, oldest first (repeats kept)
    #[must_use]
    pub fn completed(&self) -> Vec<ItemId> {
        self.history
            .iter()
            .filter(|event| event.kind == InteractionKind::Finish)
            .map(|event| event.item_id)
            .collect()
    }

    /// The last `n` completions, oldest first
    #[must_use]
    pub fn recent_completed(&self, n: usize) -> Vec<ItemId> {
        let completed = self.completed();
        let start = completed.len().saturating_sub(n);
        completed[start..].to_vec()
    }

    /// Up to `n` distinct positively-engaged items, newest first
    #[must_use]
    pub fn recent_positive(&self, n: usize) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        self.history
            .iter()
            .rev()
            .filter(|event| event.is_positive())
            .map(|event| event.item_id)
            .filter(|id| seen.insert(*id))
            .take(n)
            .collect()
    }

    /// Distinct items the user has completed
    #[must_use]
    pub fn completed_set(&self) -> HashSet<ItemId> {
        self.completed().into_iter().collect()
    }
}

/// Common contract of every strategy engine
#[async_trait]
pub trait RecommendationStrategy: Send + Sync {
    /// Which engine this is
    fn kind(&self) -> StrategyKind;

    /// Score catalog items for the user, best first, at most `limit`
    async fn recommend(
        &self,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> AppResult<Vec<ScoredItem>>;
}

/// Seeded generator shared across requests
///
/// The lock is held only for the duration of one synchronous closure.
#[derive(Debug)]
pub struct SharedRng(Mutex<ChaCha8Rng>);

impl SharedRng {
    /// Deterministic generator
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(Mutex::new(ChaCha8Rng::seed_from_u64(seed)))
    }

    /// Generator seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(Mutex::new(ChaCha8Rng::from_entropy()))
    }

    /// Run `f` with exclusive access to the generator
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use pierre_coach_core::models::{
        CatalogItem, DifficultyTier, Equipment, ItemId, MuscleGroup,
    };

    pub fn item(id: u64, group: MuscleGroup, tier: DifficultyTier, level: u32) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            name: format!("exercise {id}"),
            muscle_group: group,
            equipment: Equipment::None,
            difficulty_tier: tier,
            numeric_level: level,
            tags: Default::default(),
            calorie_rate: 5.0,
            description: String::new(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_rank_breaks_ties_by_id() {
        let ranked = rank(
            vec![
                ScoredItem::new(ItemId(3), 0.5),
                ScoredItem::new(ItemId(1), 0.5),
                ScoredItem::new(ItemId(2), 0.9),
            ],
            2,
        );
        let ids: Vec<ItemId> = ranked.iter().map(|s| s.item_id).collect();
        assert_eq!(ids, vec![ItemId(2), ItemId(1)]);
    }

    #[test]
    fn test_context_history_views() {
        let user = Uuid::new_v4();
        let mut ctx = RecommendationContext::new(
            UserProfile::new(user),
            UserState::new(user),
            Utc::now(),
        );
        for (id, kind) in [
            (1, InteractionKind::Finish),
            (2, InteractionKind::Like),
            (3, InteractionKind::Finish),
            (2, InteractionKind::Finish),
            (4, InteractionKind::Skip),
        ] {
            ctx.history.push(InteractionEvent::new(user, ItemId(id), kind));
        }

        assert_eq!(ctx.recent_completed(2), vec![ItemId(3), ItemId(2)]);
        assert_eq!(ctx.recent_positive(5), vec![ItemId(2), ItemId(3), ItemId(1)]);
        assert_eq!(ctx.completed_set().len(), 3);
    }
}
