// ABOUTME: Append-only interaction ledger abstraction and in-memory implementation
// ABOUTME: Queries by user, kind, and time range with incrementally maintained bandit arms
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Interaction Ledger
//!
//! Source of truth for every personalization signal. Events are appended and
//! never mutated. Bandit arm counters are folded in on append so engines do
//! not rescan a user's history per request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{
    ArmCounts, InteractionEvent, InteractionKind, ItemEngagement, ItemId,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

/// Append-only store of user↔exercise events
#[async_trait]
pub trait InteractionLedger: Send + Sync {
    /// Append one event
    async fn append(&self, event: InteractionEvent) -> AppResult<()>;

    /// A user's events in chronological order, optionally only those at or after `since`
    async fn events_for_user(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<InteractionEvent>>;

    /// Every event of one kind, chronological
    async fn events_by_kind(&self, kind: InteractionKind) -> AppResult<Vec<InteractionEvent>>;

    /// Every event with `start <= timestamp < end`, chronological
    async fn events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<InteractionEvent>>;

    /// Count and mean signal per item over events of the given kinds since `since`
    async fn aggregate_by_item(
        &self,
        kinds: &[InteractionKind],
        since: DateTime<Utc>,
    ) -> AppResult<BTreeMap<ItemId, ItemEngagement>>;

    /// Bandit tallies for every item the user has interacted with
    async fn arm_counts(&self, user_id: Uuid) -> AppResult<HashMap<ItemId, ArmCounts>>;

    /// Number of events logged for a user
    async fn interaction_count(&self, user_id: Uuid) -> AppResult<usize>;
}

/// Ledger held in memory
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    events: RwLock<Vec<InteractionEvent>>,
    arms: DashMap<Uuid, HashMap<ItemId, ArmCounts>>,
}

impl InMemoryLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, predicate: F) -> Vec<InteractionEvent>
    where
        F: Fn(&InteractionEvent) -> bool + Send,
    {
        let mut selected: Vec<InteractionEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| predicate(event))
            .cloned()
            .collect();
        selected.sort_by_key(|event| event.timestamp);
        selected
    }
}

#[async_trait]
impl InteractionLedger for InMemoryLedger {
    async fn append(&self, event: InteractionEvent) -> AppResult<()> {
        trace!(
            user_id = %event.user_id,
            item_id = %event.item_id,
            kind = %event.kind,
            signal = event.signal,
            "Appending interaction"
        );
        self.arms
            .entry(event.user_id)
            .or_default()
            .entry(event.item_id)
            .or_default()
            .observe(&event);
        self.events.write().await.push(event);
        Ok(())
    }

    async fn events_for_user(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<InteractionEvent>> {
        Ok(self
            .select(|event| {
                event.user_id == user_id && since.is_none_or(|start| event.timestamp >= start)
            })
            .await)
    }

    async fn events_by_kind(&self, kind: InteractionKind) -> AppResult<Vec<InteractionEvent>> {
        Ok(self.select(|event| event.kind == kind).await)
    }

    async fn events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<InteractionEvent>> {
        Ok(self
            .select(|event| event.timestamp >= start && event.timestamp < end)
            .await)
    }

    async fn aggregate_by_item(
        &self,
        kinds: &[InteractionKind],
        since: DateTime<Utc>,
    ) -> AppResult<BTreeMap<ItemId, ItemEngagement>> {
        let mut sums: BTreeMap<ItemId, (u64, f64)> = BTreeMap::new();
        for event in self.events.read().await.iter() {
            if event.timestamp >= since && kinds.contains(&event.kind) {
                let entry = sums.entry(event.item_id).or_default();
                entry.0 += 1;
                entry.1 += event.signal;
            }
        }
        Ok(sums
            .into_iter()
            .map(|(item_id, (count, total))| {
                (
                    item_id,
                    ItemEngagement {
                        count,
                        mean_signal: total / count as f64,
                    },
                )
            })
            .collect())
    }

    async fn arm_counts(&self, user_id: Uuid) -> AppResult<HashMap<ItemId, ArmCounts>> {
        Ok(self
            .arms
            .get(&user_id)
            .map(|arms| arms.clone())
            .unwrap_or_default())
    }

    async fn interaction_count(&self, user_id: Uuid) -> AppResult<usize> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .filter(|event| event.user_id == user_id)
            .count())
    }
}
