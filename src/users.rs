// ABOUTME: User profile and recommendation state persistence with upsert-by-user semantics
// ABOUTME: In-memory implementation returns defaults for users the store has never seen
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use dashmap::DashMap;
use pierre_coach_core::errors::AppResult;
use pierre_coach_core::models::{UserProfile, UserState};
use tracing::debug;
use uuid::Uuid;

/// In-place edit applied to a user's state under the store's lock
pub type StateUpdate = Box<dyn FnOnce(&mut UserState) + Send>;

/// Per-user profile and state storage
#[async_trait]
pub trait UserStateStore: Send + Sync {
    /// Body profile, or a default profile for unknown users
    async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile>;

    /// Insert or replace a profile
    async fn upsert_profile(&self, profile: UserProfile) -> AppResult<()>;

    /// Recommendation state, or a fresh state for unknown users
    async fn get_or_default(&self, user_id: Uuid) -> AppResult<UserState>;

    /// Insert or replace state, keyed by `state.user_id`
    async fn upsert_state(&self, state: UserState) -> AppResult<()>;

    /// Atomically apply `update` to the stored (or fresh) state; returns the result
    async fn update_state(&self, user_id: Uuid, update: StateUpdate) -> AppResult<UserState>;
}

/// User store held in memory
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    profiles: DashMap<Uuid, UserProfile>,
    states: DashMap<Uuid, UserState>,
}

impl InMemoryUserStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStateStore for InMemoryUserStore {
    async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        Ok(self
            .profiles
            .get(&user_id)
            .map_or_else(|| UserProfile::new(user_id), |entry| entry.clone()))
    }

    async fn upsert_profile(&self, profile: UserProfile) -> AppResult<()> {
        debug!(user_id = %profile.user_id, "Upserting user profile");
        self.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    async fn get_or_default(&self, user_id: Uuid) -> AppResult<UserState> {
        Ok(self
            .states
            .get(&user_id)
            .map_or_else(|| UserState::new(user_id), |entry| entry.clone()))
    }

    async fn upsert_state(&self, state: UserState) -> AppResult<()> {
        debug!(
            user_id = %state.user_id,
            fatigue = state.fatigue_level,
            "Upserting user state"
        );
        self.states.insert(state.user_id, state);
        Ok(())
    }

    async fn update_state(&self, user_id: Uuid, update: StateUpdate) -> AppResult<UserState> {
        let mut entry = self
            .states
            .entry(user_id)
            .or_insert_with(|| UserState::new(user_id));
        update(entry.value_mut());
        debug!(%user_id, fatigue = entry.fatigue_level, "Updated user state");
        Ok(entry.clone())
    }
}
