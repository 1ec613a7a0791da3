// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides catalog builders, demo fixture loading, failing oracles, and service wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]
//! Shared test utilities for `pierre_coach`
//!
//! This module provides common setup functions to reduce duplication
//! across integration tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pierre_coach::catalog::{
    CatalogFixture, CatalogGraph, InMemoryCatalog, InMemoryTransitionGraph, ObservedTransition,
};
use pierre_coach::config::CoachConfig;
use pierre_coach::errors::{AppError, AppResult, RecommendationError};
use pierre_coach::inference::ModelRegistry;
use pierre_coach::models::{
    CatalogItem, DifficultyTier, Equipment, InteractionEvent, InteractionKind, ItemId,
    MuscleGroup, PrerequisiteEdge, StrategyKind,
};
use pierre_coach::oracle::{KeywordOracle, OracleFilter, OracleHit, VectorOracle};
use pierre_coach::service::{CoachService, CoachStores};
use pierre_coach::strategies::{
    RecommendationContext, RecommendationStrategy, ScoredItem, SharedRng,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Minimal active catalog item
pub fn item(id: u64, group: MuscleGroup, tier: DifficultyTier, level: u32) -> CatalogItem {
    CatalogItem {
        id: ItemId(id),
        name: format!("exercise {id}"),
        muscle_group: group,
        equipment: Equipment::None,
        difficulty_tier: tier,
        numeric_level: level,
        tags: BTreeSet::new(),
        calorie_rate: 5.0,
        description: String::new(),
        is_active: true,
    }
}

/// Same as [`item`] with tags
pub fn tagged(mut item: CatalogItem, tags: &[&str]) -> CatalogItem {
    item.tags = tags.iter().map(|tag| (*tag).to_owned()).collect();
    item
}

/// Prerequisite edge `from -> to`
pub const fn prerequisite(from: u64, to: u64) -> PrerequisiteEdge {
    PrerequisiteEdge {
        from_item: ItemId(from),
        to_item: ItemId(to),
    }
}

/// Historical transition `from -> to` seen `count` times
pub const fn transition(from: u64, to: u64, count: u32) -> ObservedTransition {
    ObservedTransition {
        from_item: ItemId(from),
        to_item: ItemId(to),
        count,
    }
}

/// Path of the bundled demo catalog
pub fn demo_catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/catalog.json")
}

/// The bundled demo catalog
pub async fn demo_fixture() -> Result<CatalogFixture> {
    init_test_logging();
    Ok(CatalogFixture::from_path(demo_catalog_path()).await?)
}

/// Immutable snapshot of the demo catalog
pub async fn demo_graph() -> Result<CatalogGraph> {
    let fixture = demo_fixture().await?;
    Ok(CatalogGraph::new(fixture.items, &fixture.prerequisites))
}

/// Configuration whose model directory does not exist, so no weights load
pub fn test_config() -> CoachConfig {
    let mut config = CoachConfig::default();
    config.models.weights_dir = std::env::temp_dir().join(format!("pierre-coach-{}", Uuid::new_v4()));
    config
}

/// Demo-catalog service with a fixed random seed
pub async fn demo_service(seed: u64) -> Result<CoachService> {
    let fixture = demo_fixture().await?;
    Ok(CoachService::from_fixture(test_config(), &fixture, Some(seed)).await?)
}

/// Handle to the in-memory catalog behind a service, for activating items mid-test
pub struct TestCatalog {
    pub catalog: InMemoryCatalog,
    pub service: CoachService,
}

/// Service over explicit items and transitions with the given oracle
pub fn service_with(
    items: Vec<CatalogItem>,
    edges: &[PrerequisiteEdge],
    transitions: &[ObservedTransition],
    oracle: Arc<dyn VectorOracle>,
    config: CoachConfig,
    seed: u64,
) -> Result<TestCatalog> {
    init_test_logging();
    let registry = Arc::new(ModelRegistry::heuristic(&items, &config.models));
    let catalog = InMemoryCatalog::new(items, edges)?;
    let stores = CoachStores::in_memory(
        catalog.clone(),
        InMemoryTransitionGraph::with_history(transitions),
    );
    let service = CoachService::new(
        config,
        stores,
        oracle,
        registry,
        Arc::new(SharedRng::seeded(seed)),
    );
    Ok(TestCatalog { catalog, service })
}

/// Service over explicit items using the keyword oracle
pub fn keyword_service(items: Vec<CatalogItem>, edges: &[PrerequisiteEdge]) -> Result<TestCatalog> {
    let oracle: Arc<dyn VectorOracle> = Arc::new(KeywordOracle::new(&items));
    service_with(items, edges, &[], oracle, test_config(), 7)
}

/// Give a user enough finished exercises to leave cold start
pub async fn warm_up(
    service: &CoachService,
    user_id: Uuid,
    items: &[u64],
    start: DateTime<Utc>,
) -> Result<()> {
    for (offset, id) in items.iter().enumerate() {
        service
            .record_interaction(
                InteractionEvent::new(user_id, ItemId(*id), InteractionKind::Finish)
                    .at(start + Duration::minutes(offset as i64)),
            )
            .await?;
    }
    Ok(())
}

/// Oracle whose backend is always down
#[derive(Debug, Default)]
pub struct OfflineOracle {
    pub calls: AtomicUsize,
}

impl OfflineOracle {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorOracle for OfflineOracle {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn embed_and_search(
        &self,
        _text: &str,
        _k: usize,
        _filter: Option<OracleFilter>,
    ) -> Result<Vec<OracleHit>, RecommendationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RecommendationError::OracleError {
            message: "connection refused".to_owned(),
        })
    }
}

/// Oracle that answers only after `delay`
#[derive(Debug)]
pub struct SlowOracle {
    pub delay: std::time::Duration,
    pub hits: Vec<OracleHit>,
}

#[async_trait]
impl VectorOracle for SlowOracle {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn embed_and_search(
        &self,
        _text: &str,
        k: usize,
        _filter: Option<OracleFilter>,
    ) -> Result<Vec<OracleHit>, RecommendationError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.hits.iter().copied().take(k).collect())
    }
}

/// Engine that always errors, registered under any kind
pub struct FailingEngine(pub StrategyKind);

#[async_trait]
impl RecommendationStrategy for FailingEngine {
    fn kind(&self) -> StrategyKind {
        self.0
    }

    async fn recommend(
        &self,
        _catalog: &CatalogGraph,
        _ctx: &RecommendationContext,
        _limit: usize,
    ) -> AppResult<Vec<ScoredItem>> {
        Err(AppError::internal(format!("{} exploded", self.0)))
    }
}
