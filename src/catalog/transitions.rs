// ABOUTME: Transition edge store recording which exercise followed which within sessions
// ABOUTME: Atomic per-source weight increments with deferred probability normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::ObservedTransition;
use async_trait::async_trait;
use dashmap::DashMap;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{ItemId, TransitionEdge};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tracing::debug;

/// Storage for observed "did B after A" statistics
#[async_trait]
pub trait TransitionGraph: Send + Sync {
    /// Count one observed `from → to` transition
    ///
    /// The increment is atomic with respect to concurrent writers of the same
    /// edge. Probabilities are not touched until the next recompute.
    async fn record_transition(&self, from: ItemId, to: ItemId) -> AppResult<()>;

    /// Renormalize every source's outgoing weights into probabilities
    ///
    /// Returns the number of edges written.
    async fn recompute_probabilities(&self) -> AppResult<usize>;

    /// Outgoing edges of `from`: probability desc, then weight desc, then target id
    async fn outgoing(&self, from: ItemId) -> AppResult<Vec<TransitionEdge>>;
}

/// Transition graph keyed by source item
///
/// Each source row sits behind its own `DashMap` entry lock, so concurrent
/// session completions never lose an increment.
#[derive(Debug, Default)]
pub struct InMemoryTransitionGraph {
    rows: DashMap<ItemId, BTreeMap<ItemId, TransitionEdge>>,
    pending: AtomicU64,
}

impl InMemoryTransitionGraph {
    /// Empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph seeded from historical counts, with probabilities already normalized
    #[must_use]
    pub fn with_history(history: &[ObservedTransition]) -> Self {
        let graph = Self::new();
        for observed in history {
            graph.add_weight(observed.from_item, observed.to_item, f64::from(observed.count));
        }
        graph.normalize_all();
        graph
    }

    /// Writes since the last recompute
    #[must_use]
    pub fn pending_updates(&self) -> u64 {
        self.pending.load(AtomicOrdering::Acquire)
    }

    fn add_weight(&self, from: ItemId, to: ItemId, weight: f64) -> bool {
        if from == to {
            debug!(item_id = %from, "Ignoring self transition");
            return false;
        }
        let mut row = self.rows.entry(from).or_default();
        row.entry(to)
            .and_modify(|edge| edge.weight += weight)
            .or_insert(TransitionEdge {
                from_item: from,
                to_item: to,
                weight,
                probability: 0.0,
            });
        true
    }

    fn normalize_all(&self) -> usize {
        let mut written = 0;
        for mut row in self.rows.iter_mut() {
            let total: f64 = row.values().map(|edge| edge.weight).sum();
            for edge in row.values_mut() {
                edge.probability = if total > 0.0 {
                    edge.weight / total
                } else {
                    0.0
                };
                written += 1;
            }
        }
        self.pending.store(0, AtomicOrdering::Release);
        written
    }
}

fn edge_order(a: &TransitionEdge, b: &TransitionEdge) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| b.weight.total_cmp(&a.weight))
        .then_with(|| a.to_item.cmp(&b.to_item))
}

#[async_trait]
impl TransitionGraph for InMemoryTransitionGraph {
    async fn record_transition(&self, from: ItemId, to: ItemId) -> AppResult<()> {
        if self.add_weight(from, to, 1.0) {
            self.pending.fetch_add(1, AtomicOrdering::AcqRel);
        }
        Ok(())
    }

    async fn recompute_probabilities(&self) -> AppResult<usize> {
        let written = self.normalize_all();
        debug!(edges = written, "Recomputed transition probabilities");
        Ok(written)
    }

    async fn outgoing(&self, from: ItemId) -> AppResult<Vec<TransitionEdge>> {
        let mut edges: Vec<TransitionEdge> = self
            .rows
            .get(&from)
            .map(|row| row.values().copied().collect())
            .unwrap_or_default();
        edges.sort_by(edge_order);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_probabilities_sum_to_one_after_recompute() {
        let graph = InMemoryTransitionGraph::new();
        for _ in 0..3 {
            graph.record_transition(ItemId(1), ItemId(2)).await.unwrap();
        }
        graph.record_transition(ItemId(1), ItemId(3)).await.unwrap();
        graph.record_transition(ItemId(1), ItemId(1)).await.unwrap();
        assert_eq!(graph.pending_updates(), 4);

        graph.recompute_probabilities().await.unwrap();
        let edges = graph.outgoing(ItemId(1)).await.unwrap();

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].to_item, ItemId(2));
        assert!((edges[0].probability - 0.75).abs() < 1e-12);
        let total: f64 = edges.iter().map(|edge| edge.probability).sum();
        assert!(total <= 1.0 + 1e-12);
        assert_eq!(graph.pending_updates(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let graph = Arc::new(InMemoryTransitionGraph::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let graph = Arc::clone(&graph);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    graph.record_transition(ItemId(4), ItemId(5)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let edges = graph.outgoing(ItemId(4)).await.unwrap();
        assert!((edges[0].weight - 400.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unnormalized_edges_order_by_weight() {
        let graph = InMemoryTransitionGraph::new();
        graph.record_transition(ItemId(1), ItemId(9)).await.unwrap();
        graph.record_transition(ItemId(1), ItemId(3)).await.unwrap();
        graph.record_transition(ItemId(1), ItemId(9)).await.unwrap();

        let edges = graph.outgoing(ItemId(1)).await.unwrap();
        assert_eq!(edges[0].to_item, ItemId(9));
        assert!(graph.outgoing(ItemId(42)).await.unwrap().is_empty());
    }
}
