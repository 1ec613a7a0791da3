// ABOUTME: Persistence of recommendation batches keyed by user and scenario
// ABOUTME: Replacing a batch supersedes the previous one and keeps a bounded history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use dashmap::DashMap;
use pierre_coach_core::constants::router;
use pierre_coach_core::errors::{AppError, AppResult};
use pierre_coach_core::models::{Recommendation, RecommendationBatch, Scenario};
use std::collections::{HashMap, VecDeque};
use tracing::trace;
use uuid::Uuid;

/// Batch persistence used by the router cache and feedback handling
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Persist a batch as the current one for its (user, scenario)
    async fn replace_batch(&self, batch: RecommendationBatch) -> AppResult<()>;

    /// Most recent batch for a (user, scenario)
    async fn latest_batch(
        &self,
        user_id: Uuid,
        scenario: Scenario,
    ) -> AppResult<Option<RecommendationBatch>>;

    /// Flag one recommendation as seen; returns it
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` when the user has no such recommendation
    async fn mark_seen(&self, user_id: Uuid, recommendation_id: Uuid) -> AppResult<Recommendation>;

    /// Recently stored batches for a user, oldest first
    async fn history(&self, user_id: Uuid) -> AppResult<Vec<RecommendationBatch>>;
}

#[derive(Debug, Default)]
struct UserBatches {
    latest: HashMap<Scenario, RecommendationBatch>,
    history: VecDeque<RecommendationBatch>,
}

impl UserBatches {
    fn all_mut(&mut self) -> impl Iterator<Item = &mut RecommendationBatch> {
        self.latest.values_mut().chain(self.history.iter_mut())
    }
}

/// Batches held in memory: the current one per scenario plus a bounded history
#[derive(Debug)]
pub struct InMemoryRecommendationStore {
    batches: DashMap<Uuid, UserBatches>,
    history_limit: usize,
}

impl Default for InMemoryRecommendationStore {
    fn default() -> Self {
        Self::with_history_limit(router::BATCH_HISTORY_LIMIT)
    }
}

impl InMemoryRecommendationStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store keeping at most `limit` batches of history per user
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            batches: DashMap::new(),
            history_limit: limit.max(1),
        }
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn replace_batch(&self, batch: RecommendationBatch) -> AppResult<()> {
        trace!(
            user_id = %batch.user_id,
            scenario = %batch.scenario,
            items = batch.items.len(),
            "Persisting recommendation batch"
        );
        // Single entry lock: readers see the old batch or the new one, never a mix
        let mut entry = self.batches.entry(batch.user_id).or_default();
        if entry.history.len() >= self.history_limit {
            entry.history.pop_front();
        }
        entry.history.push_back(batch.clone());
        entry.latest.insert(batch.scenario, batch);
        Ok(())
    }

    async fn latest_batch(
        &self,
        user_id: Uuid,
        scenario: Scenario,
    ) -> AppResult<Option<RecommendationBatch>> {
        Ok(self
            .batches
            .get(&user_id)
            .and_then(|batches| batches.latest.get(&scenario).cloned()))
    }

    async fn mark_seen(&self, user_id: Uuid, recommendation_id: Uuid) -> AppResult<Recommendation> {
        let mut batches = self
            .batches
            .get_mut(&user_id)
            .ok_or_else(|| missing_recommendation(user_id, recommendation_id))?;
        let mut found = None;
        for rec in batches
            .all_mut()
            .flat_map(|batch| batch.items.iter_mut())
            .filter(|rec| rec.id == recommendation_id)
        {
            rec.seen = true;
            found = Some(rec.clone());
        }
        found.ok_or_else(|| missing_recommendation(user_id, recommendation_id))
    }

    async fn history(&self, user_id: Uuid) -> AppResult<Vec<RecommendationBatch>> {
        Ok(self
            .batches
            .get(&user_id)
            .map(|batches| batches.history.iter().cloned().collect())
            .unwrap_or_default())
    }
}

fn missing_recommendation(user_id: Uuid, recommendation_id: Uuid) -> AppError {
    AppError::not_found(format!("recommendation {recommendation_id}"))
        .with_user_id(user_id)
        .with_resource_id(recommendation_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pierre_coach_core::models::ItemId;

    fn batch(user_id: Uuid, scenario: Scenario, items: &[u64]) -> RecommendationBatch {
        let created_at = Utc::now();
        RecommendationBatch {
            user_id,
            scenario,
            created_at,
            items: items
                .iter()
                .enumerate()
                .map(|(i, id)| Recommendation {
                    id: Uuid::new_v4(),
                    user_id,
                    item_id: ItemId(*id),
                    algorithm_tag: "default:cold_start".to_owned(),
                    score: 0.5,
                    rank: i as u32 + 1,
                    reason: String::new(),
                    seen: false,
                    created_at,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_latest_batch_supersedes_per_scenario() {
        let store = InMemoryRecommendationStore::new();
        let user = Uuid::new_v4();
        store.replace_batch(batch(user, Scenario::Default, &[1, 2])).await.unwrap();
        store.replace_batch(batch(user, Scenario::Discovery, &[3])).await.unwrap();
        store.replace_batch(batch(user, Scenario::Default, &[4])).await.unwrap();

        let latest = store.latest_batch(user, Scenario::Default).await.unwrap().unwrap();
        assert_eq!(latest.items[0].item_id, ItemId(4));
        assert_eq!(store.history(user).await.unwrap().len(), 3);
        assert!(store.latest_batch(user, Scenario::DailyPlan).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_seen_updates_stored_item() {
        let store = InMemoryRecommendationStore::new();
        let user = Uuid::new_v4();
        let stored = batch(user, Scenario::Default, &[7]);
        let rec_id = stored.items[0].id;
        store.replace_batch(stored).await.unwrap();

        let seen = store.mark_seen(user, rec_id).await.unwrap();
        assert!(seen.seen);
        let latest = store.latest_batch(user, Scenario::Default).await.unwrap().unwrap();
        assert!(latest.items[0].seen);
        assert!(store.mark_seen(user, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_latest_survives_eviction() {
        let store = InMemoryRecommendationStore::with_history_limit(3);
        let user = Uuid::new_v4();
        let discovery = batch(user, Scenario::Discovery, &[9]);
        let discovery_rec = discovery.items[0].id;
        store.replace_batch(discovery).await.unwrap();
        for id in 1..=5 {
            store.replace_batch(batch(user, Scenario::Default, &[id])).await.unwrap();
        }

        let history = store.history(user).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].items[0].item_id, ItemId(3));

        let kept = store.latest_batch(user, Scenario::Discovery).await.unwrap().unwrap();
        assert_eq!(kept.items[0].item_id, ItemId(9));
        assert!(store.mark_seen(user, discovery_rec).await.unwrap().seen);
    }
}
