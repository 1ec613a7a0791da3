// ABOUTME: Integration tests for the guarded vector oracle and its consumers
// ABOUTME: Deadline enforcement, circuit opening, and content similarity degradation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{demo_graph, init_test_logging, OfflineOracle, SlowOracle};
use pierre_coach::config::{EngineConfig, OracleConfig};
use pierre_coach::errors::{AppError, ErrorCode, RecommendationError};
use pierre_coach::models::{
    InteractionEvent, InteractionKind, ItemId, MuscleGroup, UserProfile, UserState,
};
use pierre_coach::oracle::{
    CircuitState, GuardedOracle, KeywordOracle, OracleFilter, OracleHit, VectorOracle,
};
use pierre_coach::strategies::{ContentSimilarity, RecommendationContext, RecommendationStrategy};
use std::sync::Arc;
use uuid::Uuid;

fn config(timeout_millis: u64, failure_threshold: u32) -> OracleConfig {
    OracleConfig {
        timeout_millis,
        circuit_failure_threshold: failure_threshold,
        ..OracleConfig::default()
    }
}

#[tokio::test]
async fn test_slow_oracle_hits_deadline() -> Result<()> {
    init_test_logging();
    let slow = SlowOracle {
        delay: std::time::Duration::from_millis(500),
        hits: vec![OracleHit {
            item_id: ItemId(1),
            distance: 0.1,
        }],
    };
    let guarded = GuardedOracle::new(Arc::new(slow), &config(20, 5));

    let error = guarded.search("push up", 3, None).await.unwrap_err();
    assert!(matches!(error, RecommendationError::OracleTimeout { .. }));
    assert_eq!(AppError::from(error).code, ErrorCode::ExternalServiceTimeout);
    assert_eq!(guarded.breaker().failure_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_repeated_failures_open_the_circuit() -> Result<()> {
    init_test_logging();
    let offline = Arc::new(OfflineOracle::default());
    let guarded = GuardedOracle::new(
        Arc::clone(&offline) as Arc<dyn VectorOracle>,
        &config(100, 2),
    );

    for _ in 0..2 {
        assert!(guarded.search("row", 5, None).await.is_err());
    }
    assert_eq!(guarded.breaker().state(), CircuitState::Open);

    let error = guarded.search("row", 5, None).await.unwrap_err();
    match error {
        RecommendationError::OracleError { message } => assert!(message.contains("circuit open")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(offline.call_count(), 2, "open circuit must not reach the backend");
    Ok(())
}

#[tokio::test]
async fn test_fast_oracle_answers_within_deadline() -> Result<()> {
    let graph = demo_graph().await?;
    let guarded = GuardedOracle::new(
        Arc::new(KeywordOracle::new(graph.items())),
        &OracleConfig::default(),
    );
    let hits = guarded
        .search(
            "squat legs strength",
            3,
            Some(OracleFilter::muscle(MuscleGroup::Legs)),
        )
        .await?;

    assert!(!hits.is_empty());
    assert!(hits.len() <= 3);
    for hit in &hits {
        let item = graph.get(hit.item_id).expect("hit is a catalog item");
        assert_eq!(item.muscle_group, MuscleGroup::Legs);
    }
    assert_eq!(guarded.breaker().state(), CircuitState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_content_similarity_degrades_to_rules_when_oracle_is_down() -> Result<()> {
    let graph = demo_graph().await?;
    let guarded = Arc::new(GuardedOracle::new(
        Arc::new(OfflineOracle::default()),
        &OracleConfig::default(),
    ));
    let engine = ContentSimilarity::new(Arc::clone(&guarded), 3, EngineConfig::default());

    let user = Uuid::new_v4();
    let now = Utc::now();
    let mut ctx = RecommendationContext::new(UserProfile::new(user), UserState::new(user), now);
    ctx.history = vec![
        InteractionEvent::new(user, ItemId(20), InteractionKind::Finish).at(now - Duration::hours(2)),
        InteractionEvent::new(user, ItemId(21), InteractionKind::Like).at(now - Duration::hours(1)),
    ];

    let picks = engine.recommend(&graph, &ctx, 5).await?;
    assert!(!picks.is_empty());
    for pick in &picks {
        assert_ne!(pick.item_id, ItemId(20));
        assert_ne!(pick.item_id, ItemId(21));
        let item = graph.get(pick.item_id).expect("pick is a catalog item");
        assert_eq!(item.muscle_group, MuscleGroup::Legs);
        assert!((0.0..=1.0).contains(&pick.score));
    }

    let expected = engine.rule_score(
        graph.get(ItemId(20)).expect("demo item 20"),
        graph.get(ItemId(24)).expect("demo item 24"),
    );
    let stretch = picks
        .iter()
        .find(|pick| pick.item_id == ItemId(24))
        .expect("beginner stretch is a legs neighbour");
    assert!((stretch.score - expected).abs() < 1e-12);
    Ok(())
}
