// ABOUTME: In-process vector oracle ranking catalog items by token overlap with a query
// ABOUTME: Indexes each active item's semantic document and supports full index rebuilds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{OracleFilter, OracleHit, VectorOracle};
use async_trait::async_trait;
use pierre_coach_core::errors::RecommendationError;
use pierre_coach_core::models::{CatalogItem, DifficultyTier, ItemId, MuscleGroup};
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::info;

// Field labels present in every semantic document
const STOP_WORDS: [&str; 8] = [
    "exercise", "target", "equipment", "difficulty", "tags", "the", "and", "for",
];

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 1)
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
struct IndexedDocument {
    item_id: ItemId,
    muscle_group: MuscleGroup,
    difficulty: DifficultyTier,
    tokens: BTreeSet<String>,
}

/// Token-overlap oracle
///
/// Distance is the share of query tokens missing from the document, so a
/// document containing every query token is at distance 0.
#[derive(Debug, Default)]
pub struct KeywordOracle {
    index: RwLock<Vec<IndexedDocument>>,
}

impl KeywordOracle {
    /// Oracle indexing the given items
    #[must_use]
    pub fn new(items: &[CatalogItem]) -> Self {
        Self {
            index: RwLock::new(Self::build(items)),
        }
    }

    fn build(items: &[CatalogItem]) -> Vec<IndexedDocument> {
        items
            .iter()
            .filter(|item| item.is_active)
            .map(|item| IndexedDocument {
                item_id: item.id,
                muscle_group: item.muscle_group,
                difficulty: item.difficulty_tier,
                tokens: tokenize(&item.semantic_document()),
            })
            .collect()
    }

    /// Replace the whole index, returning the number of indexed documents
    pub async fn rebuild_index(&self, items: &[CatalogItem]) -> usize {
        let documents = Self::build(items);
        let count = documents.len();
        *self.index.write().await = documents;
        info!(documents = count, "Rebuilt keyword oracle index");
        count
    }
}

#[async_trait]
impl VectorOracle for KeywordOracle {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn embed_and_search(
        &self,
        text: &str,
        k: usize,
        filter: Option<OracleFilter>,
    ) -> Result<Vec<OracleHit>, RecommendationError> {
        let query = tokenize(text);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let filter = filter.unwrap_or_default();

        let index = self.index.read().await;
        let mut hits: Vec<OracleHit> = index
            .iter()
            .filter(|doc| filter.muscle_group.is_none_or(|group| doc.muscle_group == group))
            .filter(|doc| filter.difficulty.is_none_or(|tier| doc.difficulty == tier))
            .filter_map(|doc| {
                let shared = query.intersection(&doc.tokens).count();
                if shared == 0 {
                    return None;
                }
                Some(OracleHit {
                    item_id: doc.item_id,
                    distance: 1.0 - shared as f64 / query.len() as f64,
                })
            })
            .collect();
        drop(index);

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
