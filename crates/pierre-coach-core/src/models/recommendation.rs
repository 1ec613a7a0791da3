// ABOUTME: Persisted recommendation records, scenario tags, and strategy identifiers
// ABOUTME: A batch groups the ranked output of one router invocation for a user and scenario
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ItemId;

/// Caller-supplied context selecting the engine mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Real-time adjustment during training
    AutoAdjust,
    /// Finding new exercises
    Discovery,
    /// Building the day's plan
    DailyPlan,
    /// No particular context
    #[default]
    Default,
}

impl Scenario {
    /// Storage tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoAdjust => "auto_adjust",
            Self::Discovery => "discovery",
            Self::DailyPlan => "daily_plan",
            Self::Default => "default",
        }
    }

    /// Parse a scenario tag; unknown or empty tags mean [`Scenario::Default`]
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "auto_adjust" => Self::AutoAdjust,
            "discovery" => Self::Discovery,
            "daily_plan" => Self::DailyPlan,
            _ => Self::Default,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one of the strategy engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Nearest neighbours of recently liked items
    ContentSimilarity,
    /// Expert-weighted profile features
    FeatureWeighted,
    /// Next-item prediction from recent completions
    SequencePrediction,
    /// Beta-sampling multi-armed bandit
    AdaptiveBandit,
    /// Prerequisite-graph embeddings
    GraphReasoning,
    /// Popularity with diversity cap
    ColdStart,
}

impl StrategyKind {
    /// Tag used in `algorithm_tag`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContentSimilarity => "content_similarity",
            Self::FeatureWeighted => "feature_weighted",
            Self::SequencePrediction => "sequence_prediction",
            Self::AdaptiveBandit => "adaptive_bandit",
            Self::GraphReasoning => "graph_reasoning",
            Self::ColdStart => "cold_start",
        }
    }

    /// Human-readable explanation used in recommendation reasons
    #[must_use]
    pub const fn explanation(self) -> &'static str {
        match self {
            Self::ContentSimilarity => "similar to exercises you enjoyed",
            Self::FeatureWeighted => "matched to your body profile and level",
            Self::SequencePrediction => "a natural next step after your recent sessions",
            Self::AdaptiveBandit => "adapted to your current fatigue and intensity target",
            Self::GraphReasoning => "unlocked by skills you have already built",
            Self::ColdStart => "popular with athletes at your level",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked, persisted recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Record identifier
    pub id: Uuid,
    /// Recipient
    pub user_id: Uuid,
    /// Recommended catalog item
    pub item_id: ItemId,
    /// `<scenario>:<strategy>` that produced the winning score
    pub algorithm_tag: String,
    /// Merged score
    pub score: f64,
    /// 1-based rank within the batch
    pub rank: u32,
    /// Human-readable reason
    pub reason: String,
    /// Whether the user has acted on it
    pub seen: bool,
    /// Batch creation time
    pub created_at: DateTime<Utc>,
}

/// Ranked output of one router run for a (user, scenario) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBatch {
    /// Recipient
    pub user_id: Uuid,
    /// Requested scenario tag the batch is cached under
    pub scenario: Scenario,
    /// When the batch was computed
    pub created_at: DateTime<Utc>,
    /// Recommendations in rank order
    pub items: Vec<Recommendation>,
}

impl RecommendationBatch {
    /// Whether the batch is still inside the staleness window at `now`
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now - self.created_at <= window
    }
}
