// ABOUTME: Two-layer graph convolution model producing structural item embeddings
// ABOUTME: Loads layer weights from JSON or falls back to seeded Xavier initialization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::weights::{
    from_matrix, to_matrix, to_vector, uniform_matrix, GcnLayerFile, GraphWeightsFile,
};
use crate::catalog::graph::NODE_FEATURE_WIDTH;
use crate::catalog::{build_adjacency, normalize, propagate, CatalogGraph, GcnLayer, ItemEmbeddings};
use ndarray::Array1;
use pierre_coach_core::errors::{AppError, AppResult, ErrorCode};
use pierre_coach_core::models::ItemId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Graph convolution weights over structural node features
#[derive(Debug, Clone, PartialEq)]
pub struct GraphModel {
    layers: [GcnLayer; 2],
}

impl GraphModel {
    /// Xavier-uniform weights, zero biases, deterministic for a seed
    #[must_use]
    pub fn random(hidden_dim: usize, embedding_dim: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut layer = |input: usize, output: usize| {
            let bound = (6.0 / (input + output).max(1) as f64).sqrt();
            GcnLayer {
                weight: uniform_matrix(&mut rng, (input, output), bound),
                bias: Array1::zeros(output),
            }
        };
        let first = layer(NODE_FEATURE_WIDTH, hidden_dim);
        let second = layer(hidden_dim, embedding_dim);
        Self {
            layers: [first, second],
        }
    }

    /// Build from a weight file
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` unless there are exactly two layers that
    /// chain from the node feature width
    pub fn from_file(file: &GraphWeightsFile) -> AppResult<Self> {
        let [first, second] = file.layers.as_slice() else {
            return Err(AppError::new(
                ErrorCode::ModelUnavailable,
                format!("graph model needs 2 layers, found {}", file.layers.len()),
            ));
        };
        let hidden = first.bias.len();
        let output = second.bias.len();
        Ok(Self {
            layers: [
                Self::layer_from_file(first, (NODE_FEATURE_WIDTH, hidden), "layers[0]")?,
                Self::layer_from_file(second, (hidden, output), "layers[1]")?,
            ],
        })
    }

    fn layer_from_file(
        file: &GcnLayerFile,
        shape: (usize, usize),
        name: &str,
    ) -> AppResult<GcnLayer> {
        Ok(GcnLayer {
            weight: to_matrix(&file.weight, shape, &format!("{name}.weight"))?,
            bias: to_vector(&file.bias, shape.1, &format!("{name}.bias"))?,
        })
    }

    /// Serialize the weights back to the file format
    #[must_use]
    pub fn to_file(&self) -> GraphWeightsFile {
        GraphWeightsFile {
            layers: self
                .layers
                .iter()
                .map(|layer| GcnLayerFile {
                    weight: from_matrix(&layer.weight),
                    bias: layer.bias.to_vec(),
                })
                .collect(),
        }
    }

    /// Embedding width
    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.layers[1].output_dim()
    }

    /// Embed every item of the snapshot; an empty catalog yields no embeddings
    ///
    /// # Errors
    ///
    /// Returns an error only if the layer shapes are inconsistent
    pub fn embed(&self, graph: &CatalogGraph) -> AppResult<ItemEmbeddings> {
        if graph.is_empty() {
            return Ok(ItemEmbeddings::default());
        }
        let adj_norm = normalize(&build_adjacency(graph));
        let matrix = propagate(&adj_norm, &graph.node_features(), &self.layers)?;
        let ids: Vec<ItemId> = graph.items().iter().map(|item| item.id).collect();
        ItemEmbeddings::new(&ids, matrix)
    }
}
