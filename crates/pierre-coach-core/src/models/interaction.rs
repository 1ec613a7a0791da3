// ABOUTME: Interaction ledger event types (view, like, skip, finish, bookmark)
// ABOUTME: Includes per-item aggregates and bandit arm counters derived from events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ItemId;
use crate::constants::{engines, signals};

/// Kind of user↔exercise interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Opened the exercise details
    View,
    /// Explicit positive feedback
    Like,
    /// Rejected a suggestion
    Skip,
    /// Completed the exercise in a session
    Finish,
    /// Saved for later
    Bookmark,
}

impl InteractionKind {
    /// Convert to storage string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Skip => "skip",
            Self::Finish => "finish",
            Self::Bookmark => "bookmark",
        }
    }

    /// Parse from storage string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" => Some(Self::View),
            "like" => Some(Self::Like),
            "skip" | "dislike" => Some(Self::Skip),
            "finish" => Some(Self::Finish),
            "bookmark" => Some(Self::Bookmark),
            _ => None,
        }
    }

    /// Signal recorded when the caller does not supply one
    #[must_use]
    pub const fn default_signal(self) -> f64 {
        match self {
            Self::View => 0.0,
            Self::Like => signals::LIKE,
            Self::Skip => signals::NON_LIKE_FEEDBACK,
            Self::Finish => signals::FINISH,
            Self::Bookmark => 0.5,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a user interacting with a catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event identifier
    pub id: Uuid,
    /// Acting user
    pub user_id: Uuid,
    /// Catalog item interacted with
    pub item_id: ItemId,
    /// What happened
    pub kind: InteractionKind,
    /// Positive for engagement, negative for rejection
    pub signal: f64,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Create an event stamped now with the kind's default signal
    #[must_use]
    pub fn new(user_id: Uuid, item_id: ItemId, kind: InteractionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            item_id,
            kind,
            signal: kind.default_signal(),
            timestamp: Utc::now(),
        }
    }

    /// Override the signal strength
    #[must_use]
    pub const fn with_signal(mut self, signal: f64) -> Self {
        self.signal = signal;
        self
    }

    /// Override the timestamp
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Positive engagement
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.signal > 0.0
    }

    /// Rejection
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.signal < 0.0
    }
}

/// Per-item aggregate over a set of ledger events
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemEngagement {
    /// Number of matching events
    pub count: u64,
    /// Mean signal of matching events
    pub mean_signal: f64,
}

/// Positive/negative tallies for one (user, item) bandit arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArmCounts {
    /// Interactions with a positive signal
    pub positives: u32,
    /// Interactions with a negative signal
    pub negatives: u32,
}

impl ArmCounts {
    /// Fold one event into the tallies
    pub fn observe(&mut self, event: &InteractionEvent) {
        if event.is_positive() {
            self.positives += 1;
        } else if event.is_negative() {
            self.negatives += 1;
        }
    }

    /// Beta alpha parameter from a uniform (1, 1) prior
    #[must_use]
    pub fn alpha(&self) -> f64 {
        engines::BANDIT_ALPHA_STEP.mul_add(f64::from(self.positives), 1.0)
    }

    /// Beta beta parameter from a uniform (1, 1) prior; rejections weigh double
    #[must_use]
    pub fn beta(&self) -> f64 {
        engines::BANDIT_BETA_STEP.mul_add(f64::from(self.negatives), 1.0)
    }
}
