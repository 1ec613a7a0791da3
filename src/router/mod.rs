// ABOUTME: Hybrid router choosing an engine mix per scenario and merging their output
// ABOUTME: Serves fresh cached batches, applies fatigue and cold-start routing, backfills, persists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Hybrid Router
//!
//! One call to [`HybridRouter::get_recommendations`] walks this sequence:
//!
//! 1. Serve the latest batch for (user, scenario) if it is inside the
//!    staleness window, still references only active items, and holds at
//!    least `limit` entries.
//! 2. Pick engines. Heavy fatigue forces `auto_adjust` outside discovery;
//!    otherwise users with too little history get `ColdStart` alone.
//! 3. Run the engines concurrently. A failing engine is logged and skipped.
//! 4. Merge by item keeping the best score and the engine that produced it.
//!    Items needing equipment the user lacks are dropped here and in step 5.
//! 5. Backfill with `ColdStart` until `limit` is met or the catalog runs out.
//!    A fatigue-forced batch is only backfilled with low-intensity items.
//! 6. Persist the batch, ranked 1..N.

/// Batch persistence
pub mod store;

pub use store::{InMemoryRecommendationStore, RecommendationStore};

use crate::catalog::{CatalogGraph, CatalogStore};
use crate::config::RouterConfig;
use crate::ledger::InteractionLedger;
use crate::strategies::{RecommendationContext, RecommendationStrategy, ScoredItem};
use crate::users::UserStateStore;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use pierre_coach_core::errors::{AppError, AppResult, ErrorCode};
use pierre_coach_core::models::{
    ItemId, Recommendation, RecommendationBatch, Scenario, StrategyKind, UserState,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Engines the router can dispatch to, one per strategy kind
#[derive(Clone, Default)]
pub struct EngineSet {
    engines: HashMap<StrategyKind, Arc<dyn RecommendationStrategy>>,
}

impl EngineSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its own kind, replacing any previous one
    #[must_use]
    pub fn with(mut self, engine: Arc<dyn RecommendationStrategy>) -> Self {
        self.engines.insert(engine.kind(), engine);
        self
    }

    /// Engine for a kind
    #[must_use]
    pub fn get(&self, kind: StrategyKind) -> Option<&Arc<dyn RecommendationStrategy>> {
        self.engines.get(&kind)
    }

    /// Registered kinds, in a stable order
    #[must_use]
    pub fn kinds(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<_> = self.engines.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Which engines run for a request, and the scenario they run under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePlan {
    /// Scenario after safety overrides
    pub effective: Scenario,
    /// Engines in merge-priority order
    pub engines: Vec<StrategyKind>,
}

impl EnginePlan {
    /// Scenario → engine mapping with fatigue override and cold-start routing
    #[must_use]
    pub fn select(requested: Scenario, fatigued: bool, cold: bool) -> Self {
        if fatigued && requested != Scenario::Discovery {
            return Self {
                effective: Scenario::AutoAdjust,
                engines: vec![StrategyKind::AdaptiveBandit],
            };
        }
        if cold {
            return Self {
                effective: requested,
                engines: vec![StrategyKind::ColdStart],
            };
        }
        let engines = match requested {
            Scenario::AutoAdjust => vec![StrategyKind::AdaptiveBandit],
            Scenario::Discovery => vec![
                StrategyKind::GraphReasoning,
                StrategyKind::ContentSimilarity,
            ],
            Scenario::DailyPlan => vec![StrategyKind::FeatureWeighted],
            Scenario::Default => vec![
                StrategyKind::SequencePrediction,
                StrategyKind::GraphReasoning,
                StrategyKind::ContentSimilarity,
            ],
        };
        Self {
            effective: requested,
            engines,
        }
    }

    /// Per-engine quota so the split covers `limit`
    #[must_use]
    pub fn quota(&self, limit: usize) -> usize {
        limit.div_ceil(self.engines.len().max(1))
    }

    /// Whether the plan is the cold-start engine alone
    #[must_use]
    pub fn is_cold_only(&self) -> bool {
        self.engines == [StrategyKind::ColdStart]
    }
}

#[derive(Debug, Clone, Copy)]
struct Pick {
    item_id: ItemId,
    score: f64,
    engine: StrategyKind,
}

/// Whether the item is active and performable with the user's equipment
fn usable(catalog: &CatalogGraph, state: &UserState, item_id: ItemId) -> bool {
    catalog
        .get(item_id)
        .is_some_and(|item| state.has_equipment(item.equipment))
}

/// Keep each item's best score across engines; earlier engines win ties
fn merge(
    results: Vec<(StrategyKind, Vec<ScoredItem>)>,
    catalog: &CatalogGraph,
    state: &UserState,
) -> Vec<Pick> {
    let mut best: HashMap<ItemId, Pick> = HashMap::new();
    for (engine, items) in results {
        for scored in items {
            if !scored.score.is_finite() || !usable(catalog, state, scored.item_id) {
                continue;
            }
            best.entry(scored.item_id)
                .and_modify(|pick| {
                    if scored.score > pick.score {
                        pick.score = scored.score;
                        pick.engine = engine;
                    }
                })
                .or_insert(Pick {
                    item_id: scored.item_id,
                    score: scored.score,
                    engine,
                });
        }
    }
    let mut picks: Vec<Pick> = best.into_values().collect();
    picks.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    picks
}

/// Routes recommendation requests across the strategy engines
pub struct HybridRouter {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn InteractionLedger>,
    users: Arc<dyn UserStateStore>,
    store: Arc<dyn RecommendationStore>,
    engines: EngineSet,
    config: RouterConfig,
}

impl HybridRouter {
    /// Router over the given stores and engines
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn InteractionLedger>,
        users: Arc<dyn UserStateStore>,
        store: Arc<dyn RecommendationStore>,
        engines: EngineSet,
        config: RouterConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            users,
            store,
            engines,
            config,
        }
    }

    /// Router configuration
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Batch persistence used by this router
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecommendationStore> {
        &self.store
    }

    /// Recommendations for a user in a scenario, at most `limit`
    ///
    /// # Errors
    ///
    /// Only store failures propagate; engine failures degrade the batch
    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        scenario: Scenario,
        limit: usize,
    ) -> AppResult<RecommendationBatch> {
        self.get_recommendations_at(user_id, scenario, limit, Utc::now())
            .await
    }

    /// [`Self::get_recommendations`] evaluated at an explicit time
    ///
    /// # Errors
    ///
    /// Only store failures propagate; engine failures degrade the batch
    #[instrument(skip(self, now))]
    pub async fn get_recommendations_at(
        &self,
        user_id: Uuid,
        scenario: Scenario,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<RecommendationBatch> {
        let empty = RecommendationBatch {
            user_id,
            scenario,
            created_at: now,
            items: Vec::new(),
        };
        let catalog = CatalogGraph::load(self.catalog.as_ref()).await?;
        if catalog.is_empty() || limit == 0 {
            debug!(items = catalog.len(), limit, "Nothing to recommend");
            return Ok(empty);
        }

        if let Some(cached) = self.fresh_batch(user_id, scenario, limit, now, &catalog).await? {
            return Ok(cached);
        }

        let ctx = self.context(user_id, now).await?;
        let interactions = self.ledger.interaction_count(user_id).await?;
        let fatigued = ctx.state.fatigue_level > self.config.fatigue_override_threshold;
        let plan = EnginePlan::select(
            scenario,
            fatigued,
            interactions < self.config.cold_start_min_interactions,
        );
        debug!(
            effective = %plan.effective,
            engines = ?plan.engines,
            interactions,
            "Engine plan selected"
        );

        let results = self.fan_out(&plan, &catalog, &ctx, limit).await;
        let mut picks = merge(results, &catalog, &ctx.state);
        picks.truncate(limit);

        if picks.len() < limit && !plan.is_cold_only() {
            let recovery_only = fatigued && plan.effective == Scenario::AutoAdjust;
            self.backfill(&mut picks, &catalog, &ctx, limit, recovery_only)
                .await;
        }

        let batch = RecommendationBatch {
            user_id,
            scenario,
            created_at: now,
            items: picks
                .iter()
                .zip(1u32..)
                .map(|(pick, rank)| Recommendation {
                    id: Uuid::new_v4(),
                    user_id,
                    item_id: pick.item_id,
                    algorithm_tag: format!("{}:{}", plan.effective, pick.engine),
                    score: pick.score,
                    rank,
                    reason: pick.engine.explanation().to_owned(),
                    seen: false,
                    created_at: now,
                })
                .collect(),
        };

        self.store.replace_batch(batch.clone()).await?;
        info!(items = batch.items.len(), effective = %plan.effective, "Recommendation batch persisted");
        Ok(batch)
    }

    async fn fresh_batch(
        &self,
        user_id: Uuid,
        scenario: Scenario,
        limit: usize,
        now: DateTime<Utc>,
        catalog: &CatalogGraph,
    ) -> AppResult<Option<RecommendationBatch>> {
        let Some(mut cached) = self.store.latest_batch(user_id, scenario).await? else {
            debug!("Cache miss: no stored batch");
            return Ok(None);
        };
        if !cached.is_fresh(now, self.config.staleness_window()) {
            debug!(created_at = %cached.created_at, "Cache miss: batch is stale");
            return Ok(None);
        }
        if cached.items.len() < limit {
            debug!(stored = cached.items.len(), limit, "Cache miss: batch too short");
            return Ok(None);
        }
        if cached
            .items
            .iter()
            .any(|rec| catalog.get(rec.item_id).is_none())
        {
            debug!("Cache miss: batch references inactive items");
            return Ok(None);
        }
        cached.items.truncate(limit);
        debug!(items = cached.items.len(), "Cache hit");
        Ok(Some(cached))
    }

    async fn context(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<RecommendationContext> {
        let profile = self.users.profile(user_id).await?;
        let state = self.users.get_or_default(user_id).await?;
        let mut ctx = RecommendationContext::new(profile, state, now);
        ctx.history = self.ledger.events_for_user(user_id, None).await?;
        ctx.arms = self.ledger.arm_counts(user_id).await?;
        Ok(ctx)
    }

    async fn fan_out(
        &self,
        plan: &EnginePlan,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
    ) -> Vec<(StrategyKind, Vec<ScoredItem>)> {
        let quota = plan.quota(limit);
        let runs = plan.engines.iter().filter_map(|kind| {
            let Some(engine) = self.engines.get(*kind) else {
                warn!(engine = %kind, "Engine not registered, skipping");
                return None;
            };
            Some(async move { (*kind, engine.recommend(catalog, ctx, quota).await) })
        });

        join_all(runs)
            .await
            .into_iter()
            .filter_map(|(kind, result)| match result {
                Ok(items) => {
                    debug!(engine = %kind, items = items.len(), "Engine finished");
                    Some((kind, items))
                }
                Err(error) => {
                    log_engine_failure(kind, &error);
                    None
                }
            })
            .collect()
    }

    /// Append cold-start picks below the engine picks until `limit` is met
    ///
    /// With `recovery_only` the fillers are restricted to low-intensity items.
    async fn backfill(
        &self,
        picks: &mut Vec<Pick>,
        catalog: &CatalogGraph,
        ctx: &RecommendationContext,
        limit: usize,
        recovery_only: bool,
    ) {
        let Some(cold_start) = self.engines.get(StrategyKind::ColdStart) else {
            warn!("ColdStart engine not registered, batch left short");
            return;
        };
        let fillers = match cold_start.recommend(catalog, ctx, catalog.len()).await {
            Ok(fillers) => fillers,
            Err(error) => {
                log_engine_failure(StrategyKind::ColdStart, &error);
                return;
            }
        };

        let present: HashSet<ItemId> = picks.iter().map(|pick| pick.item_id).collect();
        let floor = picks.last().map(|pick| pick.score);
        let before = picks.len();
        picks.extend(
            fillers
                .into_iter()
                .filter(|scored| !present.contains(&scored.item_id))
                .filter(|scored| usable(catalog, &ctx.state, scored.item_id))
                .filter(|scored| {
                    catalog
                        .get(scored.item_id)
                        .is_some_and(|item| !recovery_only || item.is_low_intensity())
                })
                .take(limit - before)
                .map(|scored| Pick {
                    item_id: scored.item_id,
                    score: floor.map_or(scored.score, |floor| scored.score.min(floor)),
                    engine: StrategyKind::ColdStart,
                }),
        );
        debug!(added = picks.len() - before, "Backfilled with cold start");
    }
}

fn log_engine_failure(kind: StrategyKind, error: &AppError) {
    if error.code == ErrorCode::DataUnavailable {
        debug!(engine = %kind, %error, "Engine had nothing to work from");
    } else {
        warn!(engine = %kind, code = ?error.code, %error, "Engine failed, continuing without it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatigue_override_precedes_cold_start() {
        let plan = EnginePlan::select(Scenario::Default, true, true);
        assert_eq!(plan.effective, Scenario::AutoAdjust);
        assert_eq!(plan.engines, vec![StrategyKind::AdaptiveBandit]);

        let discovery = EnginePlan::select(Scenario::Discovery, true, false);
        assert_eq!(discovery.effective, Scenario::Discovery);
        assert_eq!(discovery.engines.len(), 2);
    }

    #[test]
    fn test_cold_users_get_cold_start_in_every_scenario() {
        for scenario in [
            Scenario::AutoAdjust,
            Scenario::Discovery,
            Scenario::DailyPlan,
            Scenario::Default,
        ] {
            assert!(EnginePlan::select(scenario, false, true).is_cold_only());
        }
    }

    #[test]
    fn test_default_quota_splits_three_ways() {
        let plan = EnginePlan::select(Scenario::Default, false, false);
        assert_eq!(plan.quota(5), 2);
        assert_eq!(plan.quota(6), 2);
        assert_eq!(EnginePlan::select(Scenario::DailyPlan, false, false).quota(5), 5);
    }

    #[test]
    fn test_merge_keeps_best_engine() {
        use crate::strategies::test_support::item;
        use pierre_coach_core::models::{DifficultyTier, MuscleGroup};

        let catalog = CatalogGraph::new(
            (1..=3)
                .map(|id| item(id, MuscleGroup::Back, DifficultyTier::Beginner, 1))
                .collect(),
            &[],
        );
        let picks = merge(
            vec![
                (
                    StrategyKind::GraphReasoning,
                    vec![ScoredItem::new(ItemId(1), 0.4), ScoredItem::new(ItemId(2), 0.8)],
                ),
                (
                    StrategyKind::ContentSimilarity,
                    vec![ScoredItem::new(ItemId(1), 0.9), ScoredItem::new(ItemId(99), 1.0)],
                ),
            ],
            &catalog,
            &UserState::new(Uuid::new_v4()),
        );

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].item_id, ItemId(1));
        assert_eq!(picks[0].engine, StrategyKind::ContentSimilarity);
        assert_eq!(picks[1].engine, StrategyKind::GraphReasoning);
    }

    #[test]
    fn test_merge_drops_items_needing_missing_equipment() {
        use crate::strategies::test_support::item;
        use pierre_coach_core::models::{DifficultyTier, Equipment, MuscleGroup};

        let mut barbell = item(2, MuscleGroup::Legs, DifficultyTier::Beginner, 1);
        barbell.equipment = Equipment::Barbell;
        let catalog = CatalogGraph::new(
            vec![item(1, MuscleGroup::Legs, DifficultyTier::Beginner, 1), barbell],
            &[],
        );
        let mut state = UserState::new(Uuid::new_v4());
        state.equipment_availability = vec![Equipment::Dumbbell];
        let results = vec![(
            StrategyKind::FeatureWeighted,
            vec![ScoredItem::new(ItemId(1), 0.2), ScoredItem::new(ItemId(2), 0.9)],
        )];

        let picks = merge(results.clone(), &catalog, &state);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].item_id, ItemId(1));

        state.equipment_availability.clear();
        assert_eq!(merge(results, &catalog, &state).len(), 2);
    }
}
