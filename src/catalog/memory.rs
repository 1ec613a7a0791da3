// ABOUTME: In-memory catalog store backed by ordered maps under a tokio RwLock
// ABOUTME: Loads JSON catalog fixtures with items, prerequisite edges, and seed transitions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::CatalogStore;
use async_trait::async_trait;
use pierre_coach_core::errors::{AppError, AppResult};
use pierre_coach_core::models::{
    CatalogItem, DifficultyTier, ItemId, MuscleGroup, PrerequisiteEdge,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Historical "B followed A" count used to seed the transition graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTransition {
    /// Item trained first
    pub from_item: ItemId,
    /// Item trained next
    pub to_item: ItemId,
    /// Times the pair was observed
    #[serde(default = "default_count")]
    pub count: u32,
}

const fn default_count() -> u32 {
    1
}

/// Serialized catalog: items, prerequisite edges, and optional transition history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    /// Exercise definitions
    pub items: Vec<CatalogItem>,
    /// Prerequisite edges
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteEdge>,
    /// Transition history
    #[serde(default)]
    pub transitions: Vec<ObservedTransition>,
}

impl CatalogFixture {
    /// Read a fixture from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid fixture
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::storage(format!("cannot read catalog {}", path.display())).with_source(e)
        })?;
        let fixture: Self = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            items = fixture.items.len(),
            prerequisites = fixture.prerequisites.len(),
            transitions = fixture.transitions.len(),
            "Loaded catalog fixture"
        );
        Ok(fixture)
    }
}

#[derive(Debug, Default)]
struct CatalogData {
    items: BTreeMap<ItemId, CatalogItem>,
    // (from, to) pairs; self-references are kept so the skill gate can detect them
    edges: BTreeSet<(ItemId, ItemId)>,
}

impl CatalogData {
    fn active(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.get(&id).filter(|item| item.is_active)
    }

    fn active_edges(&self) -> impl Iterator<Item = (ItemId, ItemId)> + '_ {
        self.edges
            .iter()
            .copied()
            .filter(|(from, to)| self.active(*from).is_some() && self.active(*to).is_some())
    }
}

/// Catalog store held entirely in memory
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    data: Arc<RwLock<CatalogData>>,
}

impl InMemoryCatalog {
    /// Build a catalog from items and prerequisite edges
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references an unknown item or ids repeat
    pub fn new(items: Vec<CatalogItem>, edges: &[PrerequisiteEdge]) -> AppResult<Self> {
        let mut data = CatalogData::default();
        for item in items {
            let id = item.id;
            if data.items.insert(id, item).is_some() {
                return Err(AppError::invalid_input(format!(
                    "duplicate catalog item id {id}"
                )));
            }
        }
        for edge in edges {
            for endpoint in [edge.from_item, edge.to_item] {
                if !data.items.contains_key(&endpoint) {
                    return Err(AppError::invalid_input(format!(
                        "prerequisite edge references unknown item {endpoint}"
                    )));
                }
            }
            data.edges.insert((edge.from_item, edge.to_item));
        }
        debug!(
            items = data.items.len(),
            edges = data.edges.len(),
            "Built in-memory catalog"
        );
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Build a catalog from a loaded fixture
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture is inconsistent
    pub fn from_fixture(fixture: &CatalogFixture) -> AppResult<Self> {
        Self::new(fixture.items.clone(), &fixture.prerequisites)
    }

    /// Insert or replace an item
    pub async fn upsert_item(&self, item: CatalogItem) {
        self.data.write().await.items.insert(item.id, item);
    }

    /// Add a prerequisite edge
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is unknown
    pub async fn add_prerequisite(&self, edge: PrerequisiteEdge) -> AppResult<()> {
        let mut data = self.data.write().await;
        for endpoint in [edge.from_item, edge.to_item] {
            if !data.items.contains_key(&endpoint) {
                return Err(AppError::not_found(format!("catalog item {endpoint}")));
            }
        }
        data.edges.insert((edge.from_item, edge.to_item));
        Ok(())
    }

    /// Activate or deactivate an item
    ///
    /// # Errors
    ///
    /// Returns an error if the item is unknown
    pub async fn set_active(&self, id: ItemId, active: bool) -> AppResult<()> {
        let mut data = self.data.write().await;
        let item = data
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("catalog item {id}")))?;
        item.is_active = active;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn active_items(&self) -> AppResult<Vec<CatalogItem>> {
        let data = self.data.read().await;
        Ok(data
            .items
            .values()
            .filter(|item| item.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: ItemId) -> AppResult<Option<CatalogItem>> {
        Ok(self.data.read().await.active(id).cloned())
    }

    async fn filter(
        &self,
        muscle_group: Option<MuscleGroup>,
        difficulty: Option<DifficultyTier>,
    ) -> AppResult<Vec<CatalogItem>> {
        let data = self.data.read().await;
        Ok(data
            .items
            .values()
            .filter(|item| item.is_active)
            .filter(|item| muscle_group.is_none_or(|group| item.muscle_group == group))
            .filter(|item| difficulty.is_none_or(|tier| item.difficulty_tier == tier))
            .cloned()
            .collect())
    }

    async fn prerequisites_of(&self, id: ItemId) -> AppResult<Vec<ItemId>> {
        let data = self.data.read().await;
        Ok(data
            .active_edges()
            .filter(|(_, to)| *to == id)
            .map(|(from, _)| from)
            .collect())
    }

    async fn unlocks_of(&self, id: ItemId) -> AppResult<Vec<ItemId>> {
        let data = self.data.read().await;
        Ok(data
            .active_edges()
            .filter(|(from, _)| *from == id)
            .map(|(_, to)| to)
            .collect())
    }

    async fn prerequisite_edges(&self) -> AppResult<Vec<PrerequisiteEdge>> {
        let data = self.data.read().await;
        Ok(data
            .active_edges()
            .map(|(from_item, to_item)| PrerequisiteEdge { from_item, to_item })
            .collect())
    }
}
