// ABOUTME: Ordered workout plan produced by the chain planner
// ABOUTME: Each entry references a catalog item with its set and rep targets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

use super::{CatalogItem, ItemId, MuscleGroup};

/// One exercise in a session with its volume targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Exercise to perform
    pub item: CatalogItem,
    /// Number of sets
    pub sets: u32,
    /// Repetitions per set
    pub reps: u32,
}

/// Transient ordered session; persistence is left to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Muscle group the plan was seeded for
    pub target_muscle: MuscleGroup,
    /// Level every entry was gated against
    pub user_level: u32,
    /// Entries in training order
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    /// Item ids in training order
    #[must_use]
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.entries.iter().map(|entry| entry.item.id).collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
