// ABOUTME: Coaching service facade wiring stores, engines, router, and planner together
// ABOUTME: Exposes recommendations, plans, feedback, session completion, and daily stats upkeep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coach Service
//!
//! Entry point for callers. Construct it once, share it behind an `Arc`;
//! every method takes `&self`.

use crate::catalog::{
    CatalogFixture, CatalogStore, InMemoryCatalog, InMemoryTransitionGraph, TransitionGraph,
};
use crate::config::CoachConfig;
use crate::inference::ModelRegistry;
use crate::ledger::{InMemoryLedger, InteractionLedger};
use crate::oracle::{GuardedOracle, KeywordOracle, VectorOracle};
use crate::planner::ChainPlanner;
use crate::router::{EngineSet, HybridRouter, InMemoryRecommendationStore, RecommendationStore};
use crate::skill_gate::SkillGate;
use crate::strategies::{
    AdaptiveBandit, ColdStart, ContentSimilarity, FeatureWeighted, GraphReasoning,
    SequencePrediction, SharedRng,
};
use crate::users::{InMemoryUserStore, UserStateStore};
use chrono::{DateTime, Duration, Utc};
use pierre_coach_core::constants::signals;
use pierre_coach_core::errors::{AppError, AppResult};
use pierre_coach_core::models::{
    Equipment, InteractionEvent, InteractionKind, ItemId, MuscleGroup, Plan, Recommendation,
    RecommendationBatch, Scenario, UserProfile, UserState,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Trained muscle groups are remembered this long
const TRAINED_GROUP_RETENTION_DAYS: i64 = 7;

/// Highest session performance score
const MAX_PERFORMANCE_SCORE: f64 = 5.0;

/// Persistence handles used by the service
#[derive(Clone)]
pub struct CoachStores {
    /// Exercise catalog
    pub catalog: Arc<dyn CatalogStore>,
    /// Interaction ledger
    pub ledger: Arc<dyn InteractionLedger>,
    /// Profiles and state
    pub users: Arc<dyn UserStateStore>,
    /// Recommendation batches
    pub recommendations: Arc<dyn RecommendationStore>,
    /// Observed exercise transitions
    pub transitions: Arc<dyn TransitionGraph>,
}

impl CoachStores {
    /// In-memory stores around the given catalog and transition history
    #[must_use]
    pub fn in_memory(catalog: InMemoryCatalog, transitions: InMemoryTransitionGraph) -> Self {
        Self {
            catalog: Arc::new(catalog),
            ledger: Arc::new(InMemoryLedger::new()),
            users: Arc::new(InMemoryUserStore::new()),
            recommendations: Arc::new(InMemoryRecommendationStore::new()),
            transitions: Arc::new(transitions),
        }
    }
}

/// Completed workout reported by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Exercises in the order they were performed
    pub items: Vec<ItemId>,
    /// Overall performance 0..=5, when the client rated it
    #[serde(default)]
    pub performance_score: Option<f64>,
    /// Session end
    pub completed_at: DateTime<Utc>,
}

/// Outcome of recording a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Finish events appended
    pub finished: usize,
    /// Transition edges incremented
    pub transitions: usize,
    /// Muscle groups marked as trained
    pub trained_groups: Vec<MuscleGroup>,
    /// Whether transition probabilities were recomputed
    pub recomputed: bool,
}

/// Snapshot of a user's personalization inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Body profile
    pub profile: UserProfile,
    /// Recommendation state
    pub state: UserState,
    /// Logged interactions
    pub interaction_count: usize,
    /// Below the cold-start threshold
    pub is_cold: bool,
}

/// Personalization and sequencing engine
pub struct CoachService {
    config: CoachConfig,
    stores: CoachStores,
    oracle: Arc<GuardedOracle>,
    registry: Arc<ModelRegistry>,
    router: HybridRouter,
    planner: ChainPlanner,
    sessions: AtomicU64,
}

impl CoachService {
    /// Wire every engine over the given stores, oracle, and models
    #[must_use]
    pub fn new(
        config: CoachConfig,
        stores: CoachStores,
        oracle: Arc<dyn VectorOracle>,
        registry: Arc<ModelRegistry>,
        rng: Arc<SharedRng>,
    ) -> Self {
        let oracle = Arc::new(GuardedOracle::new(oracle, &config.oracle));
        let engines_config = &config.engines;

        let engines = EngineSet::new()
            .with(Arc::new(ContentSimilarity::new(
                Arc::clone(&oracle),
                config.oracle.content_query_count,
                engines_config.clone(),
            )))
            .with(Arc::new(FeatureWeighted::new(engines_config.clone())))
            .with(Arc::new(SequencePrediction::new(
                Arc::clone(&registry),
                engines_config.clone(),
            )))
            .with(Arc::new(AdaptiveBandit::new(
                Arc::clone(&rng),
                engines_config.clone(),
            )))
            .with(Arc::new(GraphReasoning::new(
                Arc::clone(&registry),
                engines_config.clone(),
            )))
            .with(Arc::new(ColdStart::new(
                Arc::clone(&stores.ledger),
                Arc::clone(&rng),
                engines_config.clone(),
            )));

        let router = HybridRouter::new(
            Arc::clone(&stores.catalog),
            Arc::clone(&stores.ledger),
            Arc::clone(&stores.users),
            Arc::clone(&stores.recommendations),
            engines,
            config.router.clone(),
        );
        let planner = ChainPlanner::new(
            Arc::clone(&stores.catalog),
            Arc::clone(&stores.transitions),
            Arc::clone(&oracle),
            SkillGate::new(config.models.skill_gate_max_depth),
            config.oracle.seed_top_k,
            config.planner.clone(),
            rng,
        );

        Self {
            config,
            stores,
            oracle,
            registry,
            router,
            planner,
            sessions: AtomicU64::new(0),
        }
    }

    /// In-memory service over a catalog fixture with the keyword oracle
    ///
    /// Weights are read from `config.models.weights_dir` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture is inconsistent
    pub async fn from_fixture(
        config: CoachConfig,
        fixture: &CatalogFixture,
        seed: Option<u64>,
    ) -> AppResult<Self> {
        let catalog = InMemoryCatalog::from_fixture(fixture)?;
        let active: Vec<_> = catalog.active_items().await?;
        let registry = Arc::new(ModelRegistry::load(&active, &config.models).await);
        let oracle: Arc<dyn VectorOracle> = Arc::new(KeywordOracle::new(&active));
        let rng = Arc::new(seed.map_or_else(SharedRng::from_entropy, SharedRng::seeded));
        let stores = CoachStores::in_memory(
            catalog,
            InMemoryTransitionGraph::with_history(&fixture.transitions),
        );
        Ok(Self::new(config, stores, oracle, registry, rng))
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Underlying stores
    #[must_use]
    pub const fn stores(&self) -> &CoachStores {
        &self.stores
    }

    /// Guarded oracle handle
    #[must_use]
    pub const fn oracle(&self) -> &Arc<GuardedOracle> {
        &self.oracle
    }

    /// Loaded models
    #[must_use]
    pub const fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Ranked recommendations; `None` uses the configured default limit
    ///
    /// # Errors
    ///
    /// Only store failures propagate
    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        scenario: Scenario,
        limit: Option<usize>,
    ) -> AppResult<RecommendationBatch> {
        let limit = limit.unwrap_or(self.config.router.default_limit);
        self.router
            .get_recommendations(user_id, scenario, limit)
            .await
    }

    /// [`Self::get_recommendations`] evaluated at an explicit time
    ///
    /// # Errors
    ///
    /// Only store failures propagate
    pub async fn get_recommendations_at(
        &self,
        user_id: Uuid,
        scenario: Scenario,
        limit: usize,
        now: DateTime<Utc>,
    ) -> AppResult<RecommendationBatch> {
        self.router
            .get_recommendations_at(user_id, scenario, limit, now)
            .await
    }

    /// Workout plan; `None` uses the configured default length
    ///
    /// # Errors
    ///
    /// Only store failures propagate
    pub async fn build_plan(
        &self,
        seed_query: &str,
        user_level: u32,
        target_muscle: MuscleGroup,
        count: Option<usize>,
    ) -> AppResult<Plan> {
        let count = count.unwrap_or(self.config.planner.default_plan_length);
        self.planner
            .build_plan(seed_query, user_level, target_muscle, count)
            .await
    }

    /// Chain planner, for callers that inject their own generator
    #[must_use]
    pub const fn planner(&self) -> &ChainPlanner {
        &self.planner
    }

    /// Append an interaction to the ledger
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for unknown or inactive items
    pub async fn record_interaction(&self, event: InteractionEvent) -> AppResult<()> {
        if self.stores.catalog.get(event.item_id).await?.is_none() {
            return Err(AppError::not_found(format!("catalog item {}", event.item_id))
                .with_user_id(event.user_id)
                .with_resource_id(event.item_id.to_string()));
        }
        self.stores.ledger.append(event).await
    }

    /// Feedback on a served recommendation: marks it seen and logs the action
    ///
    /// `like` records +1.0; any other action records -0.5 under its own kind
    /// (unrecognized actions are logged as skips).
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` when the user has no such recommendation
    pub async fn feedback(
        &self,
        user_id: Uuid,
        recommendation_id: Uuid,
        action: &str,
    ) -> AppResult<Recommendation> {
        let recommendation = self
            .stores
            .recommendations
            .mark_seen(user_id, recommendation_id)
            .await?;

        let kind = InteractionKind::parse(action).unwrap_or_else(|| {
            warn!(%user_id, action, "Unknown feedback action, recording as skip");
            InteractionKind::Skip
        });
        let signal = if kind == InteractionKind::Like {
            signals::LIKE
        } else {
            signals::NON_LIKE_FEEDBACK
        };
        self.stores
            .ledger
            .append(InteractionEvent::new(user_id, recommendation.item_id, kind).with_signal(signal))
            .await?;

        info!(%user_id, item_id = %recommendation.item_id, %kind, "Feedback recorded");
        Ok(recommendation)
    }

    /// Record a finished workout: finish events, transitions, trained groups
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty session, `ResourceNotFound` for unknown items
    pub async fn complete_session(
        &self,
        user_id: Uuid,
        report: &SessionReport,
    ) -> AppResult<SessionSummary> {
        if report.items.is_empty() {
            return Err(AppError::invalid_input("session has no exercises").with_user_id(user_id));
        }
        let mut items = Vec::with_capacity(report.items.len());
        for id in &report.items {
            let item = self
                .stores
                .catalog
                .get(*id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("catalog item {id}"))
                        .with_user_id(user_id)
                        .with_resource_id(id.to_string())
                })?;
            items.push(item);
        }

        let signal = report.performance_score.map_or(signals::FINISH, |score| {
            (score / MAX_PERFORMANCE_SCORE).clamp(0.1, 1.0)
        });
        for item in &items {
            self.stores
                .ledger
                .append(
                    InteractionEvent::new(user_id, item.id, InteractionKind::Finish)
                        .with_signal(signal)
                        .at(report.completed_at),
                )
                .await?;
        }

        let mut transitions = 0;
        for pair in report.items.windows(2) {
            if pair[0] != pair[1] {
                self.stores.transitions.record_transition(pair[0], pair[1]).await?;
                transitions += 1;
            }
        }

        let mut trained_groups: Vec<MuscleGroup> = items.iter().map(|item| item.muscle_group).collect();
        trained_groups.sort_unstable();
        trained_groups.dedup();
        let groups = trained_groups.clone();
        let completed_at = report.completed_at;
        self.stores
            .users
            .update_state(
                user_id,
                Box::new(move |state: &mut UserState| {
                    for group in groups {
                        state.record_trained(
                            group,
                            completed_at,
                            Duration::days(TRAINED_GROUP_RETENTION_DAYS),
                        );
                    }
                    state.last_trained_at = Some(completed_at);
                }),
            )
            .await?;

        let completed = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let every = self.config.planner.transition_recompute_every.max(1);
        let recomputed = completed % every == 0;
        if recomputed {
            let rows = self.stores.transitions.recompute_probabilities().await?;
            debug!(rows, "Transition probabilities recomputed");
        }

        info!(
            %user_id,
            finished = items.len(),
            transitions,
            recomputed,
            "Session recorded"
        );
        Ok(SessionSummary {
            finished: items.len(),
            transitions,
            trained_groups,
            recomputed,
        })
    }

    /// Recompute transition probabilities now
    ///
    /// # Errors
    ///
    /// Propagates transition store failures
    pub async fn recompute_transitions(&self) -> AppResult<usize> {
        self.stores.transitions.recompute_probabilities().await
    }

    /// Fold a day's average form score (0-100) into the user's fatigue
    ///
    /// # Errors
    ///
    /// Propagates user store failures
    pub async fn apply_daily_stats(
        &self,
        user_id: Uuid,
        average_form_score: f64,
        day: DateTime<Utc>,
    ) -> AppResult<UserState> {
        let state = self
            .stores
            .users
            .update_state(
                user_id,
                Box::new(move |state: &mut UserState| state.apply_form_score(average_form_score, day)),
            )
            .await?;
        debug!(%user_id, average_form_score, fatigue = state.fatigue_level, "Daily stats applied");
        Ok(state)
    }

    /// Replace the equipment a user can access; empty means everything
    ///
    /// # Errors
    ///
    /// Propagates user store failures
    pub async fn set_equipment(
        &self,
        user_id: Uuid,
        equipment: Vec<Equipment>,
    ) -> AppResult<UserState> {
        debug!(%user_id, ?equipment, "Setting available equipment");
        self.stores
            .users
            .update_state(
                user_id,
                Box::new(move |state: &mut UserState| state.equipment_availability = equipment),
            )
            .await
    }

    /// Insert or replace a user's body profile
    ///
    /// # Errors
    ///
    /// Propagates user store failures
    pub async fn upsert_profile(&self, profile: UserProfile) -> AppResult<()> {
        self.stores.users.upsert_profile(profile).await
    }

    /// Profile, state, and history size for a user
    ///
    /// # Errors
    ///
    /// Propagates store failures
    pub async fn user_status(&self, user_id: Uuid) -> AppResult<UserStatus> {
        let interaction_count = self.stores.ledger.interaction_count(user_id).await?;
        Ok(UserStatus {
            profile: self.stores.users.profile(user_id).await?,
            state: self.stores.users.get_or_default(user_id).await?,
            interaction_count,
            is_cold: interaction_count < self.config.router.cold_start_min_interactions,
        })
    }
}
