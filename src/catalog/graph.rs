// ABOUTME: Immutable catalog snapshot with prerequisite adjacency and structural embeddings
// ABOUTME: Builds self-looped adjacency, symmetric degree normalization, and two-layer propagation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::CatalogStore;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use pierre_coach_core::errors::{AppError, AppResult, ErrorCode};
use pierre_coach_core::models::{CatalogItem, ItemId, MuscleGroup, PrerequisiteEdge};
use std::collections::HashMap;
use tracing::debug;

/// Columns of [`CatalogGraph::node_features`]
///
/// bias, prerequisite count, unlock count, numeric level, tier, then a
/// one-hot muscle group.
pub const NODE_FEATURE_WIDTH: usize = 5 + MuscleGroup::ALL.len();

/// Active catalog items and the prerequisite edges between them
#[derive(Debug, Clone, Default)]
pub struct CatalogGraph {
    items: Vec<CatalogItem>,
    index: HashMap<ItemId, usize>,
    prerequisites: HashMap<ItemId, Vec<ItemId>>,
    unlocks: HashMap<ItemId, Vec<ItemId>>,
}

impl CatalogGraph {
    /// Snapshot the given items; inactive items and dangling edges are dropped
    #[must_use]
    pub fn new(mut items: Vec<CatalogItem>, edges: &[PrerequisiteEdge]) -> Self {
        items.retain(|item| item.is_active);
        items.sort_by_key(|item| item.id);
        items.dedup_by_key(|item| item.id);

        let index: HashMap<ItemId, usize> = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id, position))
            .collect();

        let mut prerequisites: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        let mut unlocks: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        for edge in edges {
            if index.contains_key(&edge.from_item) && index.contains_key(&edge.to_item) {
                prerequisites
                    .entry(edge.to_item)
                    .or_default()
                    .push(edge.from_item);
                unlocks.entry(edge.from_item).or_default().push(edge.to_item);
            }
        }
        for list in prerequisites.values_mut().chain(unlocks.values_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            items,
            index,
            prerequisites,
            unlocks,
        }
    }

    /// Snapshot the active part of a catalog store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read
    pub async fn load(store: &dyn CatalogStore) -> AppResult<Self> {
        let items = store.active_items().await?;
        let edges = store.prerequisite_edges().await?;
        let graph = Self::new(items, &edges);
        debug!(
            items = graph.len(),
            edges = graph.edge_count(),
            "Loaded catalog graph snapshot"
        );
        Ok(graph)
    }

    /// Items in ascending id order
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Number of active items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot has no active items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of prerequisite edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.unlocks.values().map(Vec::len).sum()
    }

    /// Item by id
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.index.get(&id).map(|&position| &self.items[position])
    }

    /// Row of `id` in adjacency and embedding matrices
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Prerequisites of `id`, ascending
    #[must_use]
    pub fn prerequisites_of(&self, id: ItemId) -> &[ItemId] {
        self.prerequisites.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Items unlocked by `id`, ascending
    #[must_use]
    pub fn unlocks_of(&self, id: ItemId) -> &[ItemId] {
        self.unlocks.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Items with no prerequisites, in catalog order
    #[must_use]
    pub fn entry_points(&self) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|item| self.prerequisites_of(item.id).is_empty())
            .collect()
    }

    /// Structural node features, one row per item in catalog order
    #[must_use]
    pub fn node_features(&self) -> Array2<f64> {
        let n = self.items.len();
        let mut features = Array2::zeros((n, NODE_FEATURE_WIDTH));
        let max_degree = self
            .items
            .iter()
            .map(|item| {
                self.prerequisites_of(item.id)
                    .len()
                    .max(self.unlocks_of(item.id).len())
            })
            .max()
            .unwrap_or(0)
            .max(1) as f64;
        let max_level = self
            .items
            .iter()
            .map(|item| item.numeric_level)
            .max()
            .unwrap_or(1)
            .max(2);

        for (row, item) in self.items.iter().enumerate() {
            features[[row, 0]] = 1.0;
            features[[row, 1]] = self.prerequisites_of(item.id).len() as f64 / max_degree;
            features[[row, 2]] = self.unlocks_of(item.id).len() as f64 / max_degree;
            features[[row, 3]] =
                f64::from(item.numeric_level.saturating_sub(1)) / f64::from(max_level - 1);
            features[[row, 4]] = item.difficulty_tier.ordinal() as f64 / 2.0;
            features[[row, 5 + item.muscle_group.index()]] = 1.0;
        }
        features
    }
}

/// N×N adjacency with self-loops plus one entry per prerequisite→dependent edge
#[must_use]
pub fn build_adjacency(graph: &CatalogGraph) -> Array2<f64> {
    let mut adjacency = Array2::eye(graph.len());
    for (from, targets) in &graph.unlocks {
        let Some(row) = graph.position(*from) else {
            continue;
        };
        for to in targets {
            if let Some(col) = graph.position(*to) {
                adjacency[[row, col]] = 1.0;
            }
        }
    }
    adjacency
}

/// Symmetric degree normalization `D^-1/2 · A · D^-1/2` using row degrees
#[must_use]
pub fn normalize(adjacency: &Array2<f64>) -> Array2<f64> {
    let inv_sqrt: Array1<f64> = adjacency
        .sum_axis(Axis(1))
        .mapv(|degree| if degree > 0.0 { degree.sqrt().recip() } else { 0.0 });

    let mut normalized = adjacency.clone();
    for ((row, col), value) in normalized.indexed_iter_mut() {
        *value *= inv_sqrt[row] * inv_sqrt[col];
    }
    normalized
}

/// One graph-convolution layer: aggregate neighbours, then apply `x · W + b`
#[derive(Debug, Clone, PartialEq)]
pub struct GcnLayer {
    /// `in × out` weight matrix
    pub weight: Array2<f64>,
    /// `out` bias
    pub bias: Array1<f64>,
}

impl GcnLayer {
    /// Input width
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.weight.nrows()
    }

    /// Output width
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.weight.ncols()
    }

    /// Apply the layer to node features
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` on a shape mismatch
    pub fn forward(&self, adj_norm: &Array2<f64>, x: &Array2<f64>) -> AppResult<Array2<f64>> {
        if adj_norm.ncols() != x.nrows() || x.ncols() != self.input_dim() {
            return Err(AppError::new(
                ErrorCode::ModelUnavailable,
                format!(
                    "graph layer expects {} input features for {} nodes, got {}x{}",
                    self.input_dim(),
                    adj_norm.ncols(),
                    x.nrows(),
                    x.ncols()
                ),
            ));
        }
        if self.bias.len() != self.output_dim() {
            return Err(AppError::new(
                ErrorCode::ModelUnavailable,
                "graph layer bias width does not match weight",
            ));
        }
        let mut out = adj_norm.dot(x).dot(&self.weight);
        out += &self.bias;
        Ok(out)
    }
}

/// Two propagation rounds: `relu(Â·X·W1 + b1)` then `Â·H·W2 + b2`
///
/// # Errors
///
/// Returns `ModelUnavailable` if the layer shapes do not chain
pub fn propagate(
    adj_norm: &Array2<f64>,
    features: &Array2<f64>,
    layers: &[GcnLayer; 2],
) -> AppResult<Array2<f64>> {
    let hidden = layers[0]
        .forward(adj_norm, features)?
        .mapv(|value| value.max(0.0));
    layers[1].forward(adj_norm, &hidden)
}

/// Fixed-width embedding per catalog item
#[derive(Debug, Clone, Default)]
pub struct ItemEmbeddings {
    index: HashMap<ItemId, usize>,
    matrix: Array2<f64>,
}

impl ItemEmbeddings {
    /// Pair embedding rows with item ids
    ///
    /// # Errors
    ///
    /// Returns an error if the row count differs from the id count
    pub fn new(ids: &[ItemId], matrix: Array2<f64>) -> AppResult<Self> {
        if ids.len() != matrix.nrows() {
            return Err(AppError::internal(format!(
                "{} embedding rows for {} items",
                matrix.nrows(),
                ids.len()
            )));
        }
        let index = ids
            .iter()
            .enumerate()
            .map(|(row, id)| (*id, row))
            .collect();
        Ok(Self { index, matrix })
    }

    /// Number of embedded items
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// No structural signal available
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embedding width
    #[must_use]
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Embedding of one item
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<ArrayView1<'_, f64>> {
        self.index.get(&id).map(|&row| self.matrix.row(row))
    }

    /// Euclidean norm of an item's embedding, a proxy for how foundational it is
    #[must_use]
    pub fn norm(&self, id: ItemId) -> Option<f64> {
        self.get(id).map(|row| row.dot(&row).sqrt())
    }

    /// Mean embedding over the ids that are present
    #[must_use]
    pub fn mean_of(&self, ids: &[ItemId]) -> Option<Array1<f64>> {
        let rows: Vec<ArrayView1<'_, f64>> = ids.iter().filter_map(|id| self.get(*id)).collect();
        if rows.is_empty() {
            return None;
        }
        let mut sum = Array1::zeros(self.dim());
        for row in &rows {
            sum += row;
        }
        Some(sum / rows.len() as f64)
    }
}

/// Cosine similarity, 0.0 when either vector is all zeros
#[must_use]
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let denominator = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denominator <= f64::EPSILON {
        0.0
    } else {
        (a.dot(&b) / denominator).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pierre_coach_core::models::{DifficultyTier, Equipment};
    use std::collections::BTreeSet;

    fn item(id: u64, level: u32) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            name: format!("item-{id}"),
            muscle_group: MuscleGroup::Chest,
            equipment: Equipment::None,
            difficulty_tier: DifficultyTier::Beginner,
            numeric_level: level,
            tags: BTreeSet::new(),
            calorie_rate: 5.0,
            description: String::new(),
            is_active: true,
        }
    }

    fn edge(from: u64, to: u64) -> PrerequisiteEdge {
        PrerequisiteEdge {
            from_item: ItemId(from),
            to_item: ItemId(to),
        }
    }

    #[test]
    fn test_adjacency_has_self_loops_and_directed_edges() {
        let graph = CatalogGraph::new(vec![item(1, 1), item(2, 2), item(3, 3)], &[edge(1, 2)]);
        let adjacency = build_adjacency(&graph);

        assert_eq!(adjacency.dim(), (3, 3));
        assert!((adjacency[[0, 0]] - 1.0).abs() < f64::EPSILON);
        assert!((adjacency[[0, 1]] - 1.0).abs() < f64::EPSILON);
        assert!(adjacency[[1, 0]].abs() < f64::EPSILON);
        assert!((adjacency.sum() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inactive_items_and_their_edges_are_dropped() {
        let mut hidden = item(2, 2);
        hidden.is_active = false;
        let graph = CatalogGraph::new(vec![item(1, 1), hidden], &[edge(1, 2)]);

        assert_eq!(graph.len(), 1);
        assert!(graph.unlocks_of(ItemId(1)).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_normalize_scales_by_degree() {
        let adjacency = array![[1.0, 1.0], [0.0, 1.0]];
        let normalized = normalize(&adjacency);

        let expected = 1.0 / 2.0_f64.sqrt();
        assert!((normalized[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((normalized[[0, 1]] - expected).abs() < 1e-12);
        assert!((normalized[[1, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_propagate_shape_and_empty_catalog() {
        let layers = [
            GcnLayer {
                weight: Array2::from_elem((NODE_FEATURE_WIDTH, 4), 0.1),
                bias: Array1::zeros(4),
            },
            GcnLayer {
                weight: Array2::from_elem((4, 3), 0.1),
                bias: Array1::zeros(3),
            },
        ];

        let graph = CatalogGraph::new(vec![item(1, 1), item(2, 2)], &[edge(1, 2)]);
        let adj = normalize(&build_adjacency(&graph));
        let out = propagate(&adj, &graph.node_features(), &layers).unwrap();
        assert_eq!(out.dim(), (2, 3));

        let empty = CatalogGraph::default();
        let adj = normalize(&build_adjacency(&empty));
        let out = propagate(&adj, &empty.node_features(), &layers).unwrap();
        assert_eq!(out.nrows(), 0);
    }

    #[test]
    fn test_mean_and_cosine() {
        let embeddings =
            ItemEmbeddings::new(&[ItemId(1), ItemId(2)], array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
        let mean = embeddings.mean_of(&[ItemId(1), ItemId(2), ItemId(9)]).unwrap();

        assert!((mean[0] - 0.5).abs() < 1e-12);
        let similarity = cosine_similarity(mean.view(), embeddings.get(ItemId(1)).unwrap());
        assert!((similarity - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(embeddings.mean_of(&[ItemId(7)]).is_none());
    }
}
