// ABOUTME: Explicitly constructed model registry holding sequence and graph weights
// ABOUTME: Owns the item-id to token mapping and loads JSON weight files at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Inference
//!
//! Models are loaded once, at service construction, and shared read-only
//! behind an `Arc`. There is no process-wide model singleton: whoever builds
//! the service decides which weights it sees.
//!
//! A missing or malformed sequence weight file leaves the sequence model
//! absent, and `SequencePrediction` falls back to its heuristic table. The
//! graph model always exists: without a weight file it is randomly initialized
//! with a fixed seed, which is weak but deterministic.

/// Graph convolution model
pub mod graph;
/// Bidirectional recurrent next-item model
pub mod sequence;
/// Weight file formats and initializers
pub mod weights;

pub use graph::GraphModel;
pub use sequence::SequenceModel;
pub use weights::{GraphWeightsFile, SequenceWeightsFile};

use crate::config::ModelConfig;
use pierre_coach_core::constants::models;
use pierre_coach_core::errors::{AppError, AppResult, ErrorCode, RecommendationError};
use pierre_coach_core::models::{CatalogItem, ItemId};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Bijection between catalog ids and model tokens
///
/// Token 0 is padding; tokens `1..=len` follow ascending item id.
#[derive(Debug, Clone, Default)]
pub struct ItemIndex {
    to_token: HashMap<ItemId, usize>,
    ids: Vec<ItemId>,
}

impl ItemIndex {
    /// Index the given items
    #[must_use]
    pub fn new(items: &[CatalogItem]) -> Self {
        let mut ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let to_token = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position + 1))
            .collect();
        Self { to_token, ids }
    }

    /// Indexed item count (excluding padding)
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Token for an id, padding when unknown
    #[must_use]
    pub fn token(&self, id: ItemId) -> usize {
        self.to_token.get(&id).copied().unwrap_or(0)
    }

    /// Id for a token; `None` for padding or out of range
    #[must_use]
    pub fn id(&self, token: usize) -> Option<ItemId> {
        token.checked_sub(1).and_then(|i| self.ids.get(i).copied())
    }
}

/// Loaded models shared by the strategy engines
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    index: ItemIndex,
    sequence: Option<SequenceModel>,
    graph: GraphModel,
}

impl ModelRegistry {
    /// Assemble a registry from already-built parts
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` when the sequence model's output width does
    /// not match the index
    pub fn new(
        index: ItemIndex,
        sequence: Option<SequenceModel>,
        graph: GraphModel,
    ) -> AppResult<Self> {
        if let Some(model) = &sequence {
            if model.num_items() != index.len() {
                return Err(AppError::new(
                    ErrorCode::ModelUnavailable,
                    format!(
                        "sequence model scores {} items but catalog has {}",
                        model.num_items(),
                        index.len()
                    ),
                ));
            }
        }
        Ok(Self {
            index,
            sequence,
            graph,
        })
    }

    /// Registry without learned weights: no sequence model, seeded graph model
    #[must_use]
    pub fn heuristic(items: &[CatalogItem], config: &ModelConfig) -> Self {
        Self {
            index: ItemIndex::new(items),
            sequence: None,
            graph: GraphModel::random(
                config.graph_embedding_dim,
                config.graph_embedding_dim,
                config.random_init_seed,
            ),
        }
    }

    /// Load weights from `config.weights_dir`, degrading per model on any problem
    pub async fn load(items: &[CatalogItem], config: &ModelConfig) -> Self {
        let mut registry = Self::heuristic(items, config);
        let dir = config.weights_dir.as_path();

        match read_json::<GraphWeightsFile>(&dir.join(models::GRAPH_WEIGHTS_FILE)).await {
            Ok(Some(file)) => match GraphModel::from_file(&file) {
                Ok(model) => {
                    info!(dim = model.embedding_dim(), "Loaded graph model weights");
                    registry.graph = model;
                }
                Err(error) => warn!(%error, "Graph weights rejected, using seeded initialization"),
            },
            Ok(None) => info!("No graph weights found, using seeded initialization"),
            Err(error) => warn!(%error, "Graph weights unreadable, using seeded initialization"),
        }

        match read_json::<SequenceWeightsFile>(&dir.join(models::SEQUENCE_WEIGHTS_FILE)).await {
            Ok(Some(file)) => match SequenceModel::from_file(&file) {
                Ok(model) if model.num_items() == registry.index.len() => {
                    info!(items = model.num_items(), "Loaded sequence model weights");
                    registry.sequence = Some(model);
                }
                Ok(model) => warn!(
                    model_items = model.num_items(),
                    catalog_items = registry.index.len(),
                    "Sequence weights trained for a different catalog, model disabled"
                ),
                Err(error) => warn!(%error, "Sequence weights rejected, model disabled"),
            },
            Ok(None) => info!("No sequence weights found, sequence model disabled"),
            Err(error) => warn!(%error, "Sequence weights unreadable, model disabled"),
        }

        registry
    }

    /// Id/token mapping
    #[must_use]
    pub const fn index(&self) -> &ItemIndex {
        &self.index
    }

    /// Graph model
    #[must_use]
    pub const fn graph(&self) -> &GraphModel {
        &self.graph
    }

    /// Whether learned sequence weights are loaded
    #[must_use]
    pub const fn has_sequence_model(&self) -> bool {
        self.sequence.is_some()
    }

    /// Top `limit` next items after `history` (chronological), most probable first
    ///
    /// # Errors
    ///
    /// `ModelUnavailable` when no sequence model is loaded
    pub fn predict_next(
        &self,
        history: &[ItemId],
        limit: usize,
    ) -> Result<Vec<(ItemId, f64)>, RecommendationError> {
        let model = self
            .sequence
            .as_ref()
            .ok_or_else(|| RecommendationError::ModelUnavailable {
                model: "sequence".to_owned(),
                reason: "no weights loaded".to_owned(),
            })?;

        let tokens: Vec<usize> = history.iter().map(|id| self.index.token(*id)).collect();
        let probabilities = model.distribution(&tokens);

        let mut ranked: Vec<(ItemId, f64)> = probabilities
            .iter()
            .enumerate()
            .filter_map(|(column, p)| self.index.id(column + 1).map(|id| (id, *p)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
