// ABOUTME: Chain planner assembling a workout by walking observed exercise transitions
// ABOUTME: Seeds from the vector oracle, gates every pick by skill level, never repeats an item
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::catalog::{CatalogGraph, CatalogStore, TransitionGraph};
use crate::config::PlannerConfig;
use crate::oracle::{GuardedOracle, OracleFilter};
use crate::skill_gate::SkillGate;
use crate::strategies::SharedRng;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{CatalogItem, ItemId, MuscleGroup, Plan, PlanEntry};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds ordered, level-appropriate workout plans
pub struct ChainPlanner {
    catalog: Arc<dyn CatalogStore>,
    transitions: Arc<dyn TransitionGraph>,
    oracle: Arc<GuardedOracle>,
    gate: SkillGate,
    seed_top_k: usize,
    config: PlannerConfig,
    rng: Arc<SharedRng>,
}

impl ChainPlanner {
    /// Planner over the shared stores
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        transitions: Arc<dyn TransitionGraph>,
        oracle: Arc<GuardedOracle>,
        gate: SkillGate,
        seed_top_k: usize,
        config: PlannerConfig,
        rng: Arc<SharedRng>,
    ) -> Self {
        Self {
            catalog,
            transitions,
            oracle,
            gate,
            seed_top_k,
            config,
            rng,
        }
    }

    /// Plan of up to `count` exercises for `target_muscle`
    ///
    /// # Errors
    ///
    /// Only catalog or transition store failures propagate
    pub async fn build_plan(
        &self,
        seed_query: &str,
        user_level: u32,
        target_muscle: MuscleGroup,
        count: usize,
    ) -> AppResult<Plan> {
        let seed = self.rng.with(|rng| rng.gen::<u64>());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.build_plan_with_rng(&mut rng, seed_query, user_level, target_muscle, count)
            .await
    }

    /// [`Self::build_plan`] drawing from a caller-supplied generator
    ///
    /// # Errors
    ///
    /// Only catalog or transition store failures propagate
    pub async fn build_plan_with_rng<R: Rng + Send>(
        &self,
        rng: &mut R,
        seed_query: &str,
        user_level: u32,
        target_muscle: MuscleGroup,
        count: usize,
    ) -> AppResult<Plan> {
        let mut plan = Plan {
            target_muscle,
            user_level,
            entries: Vec::new(),
        };
        let catalog = CatalogGraph::load(self.catalog.as_ref()).await?;
        if count == 0 || catalog.is_empty() {
            return Ok(plan);
        }

        let mut used: HashSet<ItemId> = HashSet::new();
        let Some(seed) = self
            .seed(&catalog, seed_query, user_level, target_muscle)
            .await
        else {
            warn!(%target_muscle, user_level, "No level-appropriate seed for plan");
            return Ok(plan);
        };
        used.insert(seed.id);
        plan.entries.push(self.entry(seed));

        while plan.entries.len() < count {
            let Some(tail) = plan.entries.last().map(|entry| entry.item.id) else {
                break;
            };
            let candidate = self
                .next_candidate(rng, &catalog, tail, target_muscle, &used)
                .await?
                .map(|item| self.gate.safe_item(&catalog, item, user_level))
                .filter(|outcome| outcome.is_qualified(user_level))
                .map(|outcome| outcome.item())
                .filter(|item| !used.contains(&item.id));

            let Some(next) = candidate.or_else(|| self.backup(rng, &catalog, user_level, &used))
            else {
                debug!(planned = plan.entries.len(), count, "Catalog exhausted, plan ends early");
                break;
            };
            used.insert(next.id);
            plan.entries.push(self.entry(next));
        }

        info!(
            %target_muscle,
            user_level,
            planned = plan.entries.len(),
            requested = count,
            "Plan built"
        );
        Ok(plan)
    }

    /// Oracle candidates for the target muscle first, then the catalog in id order
    async fn seed<'a>(
        &self,
        catalog: &'a CatalogGraph,
        seed_query: &str,
        user_level: u32,
        target_muscle: MuscleGroup,
    ) -> Option<&'a CatalogItem> {
        let hits = match self
            .oracle
            .search(seed_query, self.seed_top_k, Some(OracleFilter::muscle(target_muscle)))
            .await
        {
            Ok(hits) => hits,
            Err(error) => {
                warn!(%error, "Seed search failed, using attribute filter");
                Vec::new()
            }
        };

        hits.iter()
            .filter_map(|hit| catalog.get(hit.item_id))
            .chain(catalog.items().iter())
            .filter(|item| item.muscle_group == target_muscle)
            .map(|item| self.gate.safe_item(catalog, item, user_level))
            .find(|outcome| outcome.is_qualified(user_level))
            .map(|outcome| outcome.item())
    }

    /// Strongest transition out of `tail`, else a random unused item from the tail's group
    async fn next_candidate<'a, R: Rng + Send>(
        &self,
        rng: &mut R,
        catalog: &'a CatalogGraph,
        tail: ItemId,
        target_muscle: MuscleGroup,
        used: &HashSet<ItemId>,
    ) -> AppResult<Option<&'a CatalogItem>> {
        let edges = self.transitions.outgoing(tail).await?;
        if let Some(top) = edges.first() {
            if rng.gen::<f64>() < self.config.follow_probability {
                if let Some(item) = catalog.get(top.to_item) {
                    return Ok(Some(item));
                }
            }
        }

        let group = catalog
            .get(tail)
            .map_or(target_muscle, |item| item.muscle_group);
        let same_group: Vec<&CatalogItem> = catalog
            .items()
            .iter()
            .filter(|item| item.muscle_group == group && !used.contains(&item.id))
            .collect();
        Ok(same_group.choose(rng).copied())
    }

    /// Any unused item, in random order, that gates to something usable
    fn backup<'a, R: Rng>(
        &self,
        rng: &mut R,
        catalog: &'a CatalogGraph,
        user_level: u32,
        used: &HashSet<ItemId>,
    ) -> Option<&'a CatalogItem> {
        let mut pool: Vec<&CatalogItem> = catalog
            .items()
            .iter()
            .filter(|item| !used.contains(&item.id))
            .collect();
        pool.shuffle(rng);
        pool.into_iter()
            .map(|item| self.gate.safe_item(catalog, item, user_level))
            .filter(|outcome| outcome.is_qualified(user_level))
            .map(|outcome| outcome.item())
            .find(|item| !used.contains(&item.id))
    }

    fn entry(&self, item: &CatalogItem) -> PlanEntry {
        let (sets, reps) = self.config.volume_for(item.difficulty_tier);
        PlanEntry {
            item: item.clone(),
            sets,
            reps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, InMemoryTransitionGraph};
    use crate::config::OracleConfig;
    use crate::oracle::KeywordOracle;
    use crate::strategies::test_support::item;
    use pierre_coach_core::models::{DifficultyTier, PrerequisiteEdge};

    async fn planner(items: Vec<CatalogItem>, edges: &[PrerequisiteEdge]) -> ChainPlanner {
        planner_with(
            items,
            edges,
            Arc::new(InMemoryTransitionGraph::new()),
            PlannerConfig::default(),
        )
    }

    fn planner_with(
        items: Vec<CatalogItem>,
        edges: &[PrerequisiteEdge],
        transitions: Arc<InMemoryTransitionGraph>,
        config: PlannerConfig,
    ) -> ChainPlanner {
        let oracle = Arc::new(GuardedOracle::new(
            Arc::new(KeywordOracle::new(&items)),
            &OracleConfig::default(),
        ));
        ChainPlanner::new(
            Arc::new(InMemoryCatalog::new(items, edges).unwrap()),
            transitions,
            oracle,
            SkillGate::default(),
            10,
            config,
            Arc::new(SharedRng::seeded(5)),
        )
    }

    #[tokio::test]
    async fn test_plan_has_no_duplicates_and_respects_level() {
        let mut items: Vec<CatalogItem> = (1..=6)
            .map(|id| item(id, MuscleGroup::Chest, DifficultyTier::Beginner, 1))
            .collect();
        items.push(item(7, MuscleGroup::Chest, DifficultyTier::Advanced, 4));
        let planner = planner(
            items,
            &[PrerequisiteEdge {
                from_item: ItemId(1),
                to_item: ItemId(7),
            }],
        )
        .await;

        for _ in 0..20 {
            let plan = planner
                .build_plan("exercise chest", 1, MuscleGroup::Chest, 5)
                .await
                .unwrap();
            assert_eq!(plan.len(), 5);
            let ids: HashSet<ItemId> = plan.item_ids().into_iter().collect();
            assert_eq!(ids.len(), 5);
            assert!(plan.entries.iter().all(|e| e.item.numeric_level <= 1));
        }
    }

    #[tokio::test]
    async fn test_small_catalog_yields_shorter_plan() {
        let planner = planner(
            vec![
                item(1, MuscleGroup::Legs, DifficultyTier::Beginner, 1),
                item(2, MuscleGroup::Arms, DifficultyTier::Beginner, 1),
            ],
            &[],
        )
        .await;

        let plan = planner
            .build_plan("squat", 1, MuscleGroup::Legs, 4)
            .await
            .unwrap();
        assert_eq!(plan.item_ids(), vec![ItemId(1), ItemId(2)]);
        assert_eq!((plan.entries[0].sets, plan.entries[0].reps), (2, 12));
    }

    #[tokio::test]
    async fn test_missing_target_muscle_gives_empty_plan() {
        let planner = planner(
            vec![item(1, MuscleGroup::Legs, DifficultyTier::Beginner, 1)],
            &[],
        )
        .await;
        let plan = planner
            .build_plan("press", 1, MuscleGroup::Shoulders, 3)
            .await
            .unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_random_step_stays_in_the_tail_group() {
        let items = vec![
            item(1, MuscleGroup::Chest, DifficultyTier::Beginner, 1),
            item(3, MuscleGroup::Back, DifficultyTier::Beginner, 1),
            item(4, MuscleGroup::Back, DifficultyTier::Beginner, 1),
            item(5, MuscleGroup::Legs, DifficultyTier::Beginner, 1),
            item(6, MuscleGroup::Legs, DifficultyTier::Beginner, 1),
        ];
        let transitions = Arc::new(InMemoryTransitionGraph::new());
        transitions.record_transition(ItemId(1), ItemId(3)).await.unwrap();
        transitions.recompute_probabilities().await.unwrap();
        let config = PlannerConfig {
            follow_probability: 1.0,
            ..PlannerConfig::default()
        };
        let planner = planner_with(items, &[], transitions, config);

        for _ in 0..10 {
            let plan = planner
                .build_plan("chest", 1, MuscleGroup::Chest, 3)
                .await
                .unwrap();
            assert_eq!(plan.item_ids(), vec![ItemId(1), ItemId(3), ItemId(4)]);
        }
    }
}
