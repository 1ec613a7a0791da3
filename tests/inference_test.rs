// ABOUTME: Integration tests for loading model weights from disk into the registry
// ABOUTME: Missing, mismatched, and malformed files degrade per model; valid files drive predictions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(missing_docs)]

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{demo_fixture, demo_graph};
use pierre_coach::config::{EngineConfig, ModelConfig};
use pierre_coach::constants::models;
use pierre_coach::errors::RecommendationError;
use pierre_coach::inference::{GraphModel, ModelRegistry, SequenceModel};
use pierre_coach::models::{InteractionEvent, InteractionKind, ItemId, UserProfile, UserState};
use pierre_coach::strategies::{RecommendationContext, RecommendationStrategy, SequencePrediction};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn config_for(dir: &Path) -> ModelConfig {
    ModelConfig {
        weights_dir: dir.to_path_buf(),
        ..ModelConfig::default()
    }
}

async fn write_json(dir: &TempDir, name: &str, value: &impl serde::Serialize) -> Result<()> {
    tokio::fs::write(dir.path().join(name), serde_json::to_vec(value)?).await?;
    Ok(())
}

#[tokio::test]
async fn test_empty_weights_dir_leaves_heuristics_in_place() -> Result<()> {
    let fixture = demo_fixture().await?;
    let dir = tempfile::tempdir()?;
    let config = config_for(dir.path());

    let registry = ModelRegistry::load(&fixture.items, &config).await;
    assert!(!registry.has_sequence_model());
    assert_eq!(registry.graph().embedding_dim(), config.graph_embedding_dim);
    assert_eq!(registry.index().len(), fixture.items.len());

    let error = registry.predict_next(&[ItemId(1)], 3).unwrap_err();
    assert!(matches!(error, RecommendationError::ModelUnavailable { .. }));
    Ok(())
}

#[tokio::test]
async fn test_valid_weight_files_are_loaded_and_used() -> Result<()> {
    let fixture = demo_fixture().await?;
    let dir = tempfile::tempdir()?;
    let sequence = SequenceModel::random(fixture.items.len(), 8, 6, 3);
    write_json(&dir, models::SEQUENCE_WEIGHTS_FILE, &sequence.to_file()).await?;
    write_json(&dir, models::GRAPH_WEIGHTS_FILE, &GraphModel::random(8, 5, 1).to_file()).await?;

    let registry = ModelRegistry::load(&fixture.items, &config_for(dir.path())).await;
    assert!(registry.has_sequence_model());
    assert_eq!(registry.graph().embedding_dim(), 5);

    let predictions = registry.predict_next(&[ItemId(1), ItemId(2)], 5)?;
    assert_eq!(predictions.len(), 5);
    let ids: HashSet<ItemId> = predictions.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids.len(), 5);
    assert!(predictions.windows(2).all(|pair| pair[0].1 >= pair[1].1));
    let mass: f64 = predictions.iter().map(|(_, p)| p).sum();
    assert!(mass > 0.0 && mass <= 1.0 + 1e-9);

    let graph = demo_graph().await?;
    assert_eq!(registry.graph().embed(&graph)?.dim(), 5);
    Ok(())
}

#[tokio::test]
async fn test_mismatched_or_malformed_files_are_ignored() -> Result<()> {
    let fixture = demo_fixture().await?;
    let dir = tempfile::tempdir()?;
    write_json(
        &dir,
        models::SEQUENCE_WEIGHTS_FILE,
        &SequenceModel::random(10, 4, 3, 1).to_file(),
    )
    .await?;
    tokio::fs::write(dir.path().join(models::GRAPH_WEIGHTS_FILE), b"{ not json").await?;

    let config = config_for(dir.path());
    let registry = ModelRegistry::load(&fixture.items, &config).await;
    assert!(!registry.has_sequence_model(), "trained for another catalog");
    assert_eq!(registry.graph().embedding_dim(), config.graph_embedding_dim);
    Ok(())
}

#[tokio::test]
async fn test_sequence_engine_prefers_model_over_fallback() -> Result<()> {
    let fixture = demo_fixture().await?;
    let dir = tempfile::tempdir()?;
    write_json(
        &dir,
        models::SEQUENCE_WEIGHTS_FILE,
        &SequenceModel::random(fixture.items.len(), 8, 6, 11).to_file(),
    )
    .await?;
    let registry = Arc::new(ModelRegistry::load(&fixture.items, &config_for(dir.path())).await);
    let engine = SequencePrediction::new(registry, EngineConfig::default());
    let graph = demo_graph().await?;

    let user = Uuid::new_v4();
    let now = Utc::now();
    let mut ctx = RecommendationContext::new(UserProfile::new(user), UserState::new(user), now);
    ctx.history = [20, 21, 25]
        .iter()
        .zip(1i64..)
        .map(|(id, minutes)| {
            InteractionEvent::new(user, ItemId(*id), InteractionKind::Finish)
                .at(now - Duration::minutes(60 - minutes))
        })
        .collect();

    let picks = engine.recommend(&graph, &ctx, 4).await?;
    assert_eq!(picks.len(), 4);
    let fallback = EngineConfig::default().sequence_fallback_score;
    assert!(picks.iter().all(|pick| pick.score < fallback));
    Ok(())
}
