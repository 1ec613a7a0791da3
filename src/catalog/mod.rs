// ABOUTME: Catalog store abstraction with an in-memory implementation and graph snapshot
// ABOUTME: Exposes active items, attribute filters, prerequisite edges, and transition statistics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Catalog
//!
//! The exercise catalog is owned by an external store. Engines only ever see
//! *active* items: every query on [`CatalogStore`] hides deactivated items and
//! any edge touching one.
//!
//! [`CatalogGraph`] is an immutable snapshot taken once per recommendation or
//! planning cycle. Structural embeddings and the skill gate work on it so a
//! single request sees a consistent catalog.

/// Immutable catalog snapshot with adjacency and graph-convolution helpers
pub mod graph;
/// In-memory catalog store and JSON fixture loading
pub mod memory;
/// Observed exercise-to-exercise transition statistics
pub mod transitions;

pub use graph::{build_adjacency, normalize, propagate, CatalogGraph, GcnLayer, ItemEmbeddings};
pub use memory::{CatalogFixture, InMemoryCatalog, ObservedTransition};
pub use transitions::{InMemoryTransitionGraph, TransitionGraph};

use async_trait::async_trait;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{
    CatalogItem, DifficultyTier, ItemId, MuscleGroup, PrerequisiteEdge,
};

/// Read access to the exercise catalog
///
/// Implementations return items in ascending id order, which is the stable
/// catalog order used for tie-breaking everywhere.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All active items
    async fn active_items(&self) -> AppResult<Vec<CatalogItem>>;

    /// One active item by id
    async fn get(&self, id: ItemId) -> AppResult<Option<CatalogItem>>;

    /// Active items matching every given attribute
    async fn filter(
        &self,
        muscle_group: Option<MuscleGroup>,
        difficulty: Option<DifficultyTier>,
    ) -> AppResult<Vec<CatalogItem>>;

    /// Active items that must be mastered before `id`, ascending
    async fn prerequisites_of(&self, id: ItemId) -> AppResult<Vec<ItemId>>;

    /// Active items that `id` unlocks, ascending
    async fn unlocks_of(&self, id: ItemId) -> AppResult<Vec<ItemId>>;

    /// Every prerequisite edge between active items
    async fn prerequisite_edges(&self) -> AppResult<Vec<PrerequisiteEdge>>;
}
