// ABOUTME: Skill gate that downgrades too-hard exercises along their prerequisite chain
// ABOUTME: Bounded walk with cycle detection; anomalies return the original item
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::catalog::CatalogGraph;
use pierre_coach_core::constants::planner;
use pierre_coach_core::errors::RecommendationError;
use pierre_coach_core::models::{CatalogItem, ItemId};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of gating one item
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome<'a> {
    /// Already within the user's level
    Unchanged(&'a CatalogItem),
    /// Replaced by a prerequisite `hops` steps up the chain
    Downgraded {
        /// Level-appropriate replacement
        item: &'a CatalogItem,
        /// Prerequisite hops walked
        hops: usize,
    },
    /// Chain ran out of prerequisites before reaching the user's level
    LastResort(&'a CatalogItem),
    /// Cycle or depth bound hit; the original item is returned
    Anomaly {
        /// The item the walk started from
        item: &'a CatalogItem,
        /// Cycle or depth description
        error: RecommendationError,
    },
}

impl<'a> GateOutcome<'a> {
    /// Item to use
    #[must_use]
    pub const fn item(&self) -> &'a CatalogItem {
        match self {
            Self::Unchanged(item)
            | Self::LastResort(item)
            | Self::Downgraded { item, .. }
            | Self::Anomaly { item, .. } => *item,
        }
    }

    /// Whether the chosen item is within `user_level`
    #[must_use]
    pub fn is_qualified(&self, user_level: u32) -> bool {
        self.item().numeric_level <= user_level
    }
}

/// Downgrades items to something the user can actually perform
#[derive(Debug, Clone, Copy)]
pub struct SkillGate {
    max_depth: usize,
}

impl Default for SkillGate {
    fn default() -> Self {
        Self::new(planner::SKILL_GATE_MAX_DEPTH)
    }
}

impl SkillGate {
    /// Gate walking at most `max_depth` prerequisite hops
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Level-appropriate stand-in for `item`
    ///
    /// Follows the first prerequisite (ascending id) until an item at or
    /// below `user_level` is found.
    #[must_use]
    pub fn safe_item<'a>(
        &self,
        catalog: &'a CatalogGraph,
        item: &'a CatalogItem,
        user_level: u32,
    ) -> GateOutcome<'a> {
        let mut current = item;
        let mut path: Vec<ItemId> = vec![item.id];
        let mut visited: HashSet<ItemId> = HashSet::from([item.id]);

        for hops in 0..=self.max_depth {
            if current.numeric_level <= user_level {
                if hops == 0 {
                    return GateOutcome::Unchanged(current);
                }
                debug!(from = %item.id, to = %current.id, hops, user_level, "Skill gate downgraded");
                return GateOutcome::Downgraded {
                    item: current,
                    hops,
                };
            }

            let Some(&next) = catalog.prerequisites_of(current.id).first() else {
                debug!(item_id = %current.id, user_level, "Skill gate exhausted prerequisites");
                return GateOutcome::LastResort(current);
            };
            path.push(next);
            if !visited.insert(next) {
                return Self::anomaly(item, format!("cycle {}", render(&path)));
            }
            let Some(prerequisite) = catalog.get(next) else {
                return GateOutcome::LastResort(current);
            };
            current = prerequisite;
        }

        Self::anomaly(
            item,
            format!("depth bound {} exceeded along {}", self.max_depth, render(&path)),
        )
    }

    fn anomaly(item: &CatalogItem, detail: String) -> GateOutcome<'_> {
        let error = RecommendationError::StructuralAnomaly {
            origin: item.id,
            detail,
        };
        warn!(item_id = %item.id, %error, "Skill gate structural anomaly, needs operator review");
        GateOutcome::Anomaly { item, error }
    }
}

fn render(path: &[ItemId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::item;
    use pierre_coach_core::models::{DifficultyTier, MuscleGroup, PrerequisiteEdge};

    fn edge(from: u64, to: u64) -> PrerequisiteEdge {
        PrerequisiteEdge {
            from_item: ItemId(from),
            to_item: ItemId(to),
        }
    }

    fn chain(levels: &[(u64, u32)], edges: &[PrerequisiteEdge]) -> CatalogGraph {
        CatalogGraph::new(
            levels
                .iter()
                .map(|(id, level)| item(*id, MuscleGroup::Chest, DifficultyTier::Beginner, *level))
                .collect(),
            edges,
        )
    }

    #[test]
    fn test_downgrades_along_first_prerequisite() {
        let catalog = chain(
            &[(1, 1), (2, 2), (3, 3), (4, 1)],
            &[edge(2, 3), edge(4, 3), edge(1, 2)],
        );
        let hard = catalog.get(ItemId(3)).unwrap();

        let outcome = SkillGate::default().safe_item(&catalog, hard, 1);
        assert_eq!(outcome.item().id, ItemId(1));
        assert!(matches!(outcome, GateOutcome::Downgraded { hops: 2, .. }));
        assert!(outcome.is_qualified(1));

        let unchanged = SkillGate::default().safe_item(&catalog, hard, 3);
        assert_eq!(unchanged, GateOutcome::Unchanged(hard));
    }

    #[test]
    fn test_no_prerequisite_is_last_resort() {
        let catalog = chain(&[(1, 5)], &[]);
        let outcome = SkillGate::default().safe_item(&catalog, catalog.get(ItemId(1)).unwrap(), 1);
        assert!(matches!(outcome, GateOutcome::LastResort(item) if item.id == ItemId(1)));
        assert!(!outcome.is_qualified(1));
    }

    #[test]
    fn test_cycle_returns_original_item() {
        let catalog = chain(&[(1, 5), (2, 5)], &[edge(1, 2), edge(2, 1)]);
        let origin = catalog.get(ItemId(1)).unwrap();

        let outcome = SkillGate::default().safe_item(&catalog, origin, 1);
        match outcome {
            GateOutcome::Anomaly { item, error } => {
                assert_eq!(item.id, ItemId(1));
                assert!(matches!(error, RecommendationError::StructuralAnomaly { .. }));
            }
            other => panic!("expected anomaly, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_an_anomaly() {
        let catalog = chain(&[(1, 5)], &[edge(1, 1)]);
        let outcome = SkillGate::default().safe_item(&catalog, catalog.get(ItemId(1)).unwrap(), 1);
        assert!(matches!(outcome, GateOutcome::Anomaly { .. }));
    }

    #[test]
    fn test_depth_bound_aborts_long_chains() {
        let levels: Vec<(u64, u32)> = (1..=10).map(|id| (id, 10)).collect();
        let edges: Vec<_> = (1..10).map(|id| edge(id, id + 1)).collect();
        let catalog = chain(&levels, &edges);

        let outcome = SkillGate::new(3).safe_item(&catalog, catalog.get(ItemId(10)).unwrap(), 1);
        assert!(matches!(outcome, GateOutcome::Anomaly { item, .. } if item.id == ItemId(10)));
    }
}
