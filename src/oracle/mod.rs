// ABOUTME: Vector-similarity oracle contract with a timeout- and circuit-guarded caller
// ABOUTME: Engines ask for nearest catalog items to a text query and degrade on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Vector-similarity oracle
//!
//! The oracle is an opaque "embed query, return nearest catalog items"
//! capability. Its absence or failure is an expected condition: callers go
//! through [`GuardedOracle`], which bounds every call with a deadline and
//! stops calling a failing backend for a while.

/// Consecutive-failure circuit breaker
pub mod circuit_breaker;
/// Deadline and circuit enforcement around an oracle
pub mod guard;
/// In-process token-overlap oracle over semantic documents
pub mod keyword;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use guard::GuardedOracle;
pub use keyword::KeywordOracle;

use async_trait::async_trait;
use pierre_coach_core::errors::RecommendationError;
use pierre_coach_core::models::{CatalogItem, DifficultyTier, ItemId, MuscleGroup};
use serde::{Deserialize, Serialize};

/// Attribute constraint applied by the oracle before ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleFilter {
    /// Only items training this group
    pub muscle_group: Option<MuscleGroup>,
    /// Only items of this tier
    pub difficulty: Option<DifficultyTier>,
}

impl OracleFilter {
    /// Restrict to one muscle group
    #[must_use]
    pub const fn muscle(group: MuscleGroup) -> Self {
        Self {
            muscle_group: Some(group),
            difficulty: None,
        }
    }

    /// Whether an item passes the filter
    #[must_use]
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.muscle_group.is_none_or(|group| item.muscle_group == group)
            && self.difficulty.is_none_or(|tier| item.difficulty_tier == tier)
    }
}

/// One ranked oracle answer; smaller distance is more similar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OracleHit {
    /// Matching catalog item
    pub item_id: ItemId,
    /// Distance to the query, `>= 0`
    pub distance: f64,
}

impl OracleHit {
    /// Similarity in `(0, 1]` derived from distance
    #[must_use]
    pub fn similarity(&self) -> f64 {
        1.0 / (1.0 + self.distance.max(0.0))
    }
}

/// Opaque nearest-neighbour search over catalog items
#[async_trait]
pub trait VectorOracle: Send + Sync {
    /// Name used in logs and circuit breaker messages
    fn name(&self) -> &'static str;

    /// Embed `text` and return up to `k` nearest items, nearest first
    async fn embed_and_search(
        &self,
        text: &str,
        k: usize,
        filter: Option<OracleFilter>,
    ) -> Result<Vec<OracleHit>, RecommendationError>;
}
