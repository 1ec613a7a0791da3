// ABOUTME: Default thresholds, windows, and weights for the coaching engine
// ABOUTME: Grouped by component so configuration defaults have a single source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Hybrid router and recommendation persistence
pub mod router {
    /// Staleness window for a persisted batch (6 hours)
    pub const STALENESS_WINDOW_SECS: u64 = 21_600;

    /// Default number of recommendations per request
    pub const DEFAULT_LIMIT: usize = 5;

    /// Fatigue above which every scenario except discovery is forced to `auto_adjust`
    pub const FATIGUE_OVERRIDE_THRESHOLD: f64 = 0.8;

    /// Users with fewer logged interactions than this are routed to `ColdStart`
    pub const COLD_START_MIN_INTERACTIONS: usize = 5;

    /// Superseded batches retained per user
    pub const BATCH_HISTORY_LIMIT: usize = 32;
}

/// Vector-similarity oracle usage
pub mod oracle {
    /// Deadline for a single `embed_and_search` call
    pub const TIMEOUT_MILLIS: u64 = 800;

    /// Candidates requested when seeding a chain plan
    pub const SEED_TOP_K: usize = 10;

    /// Positive interactions used as queries by content similarity
    pub const CONTENT_QUERY_COUNT: usize = 3;

    /// Consecutive failures before the oracle circuit opens
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;

    /// Seconds the circuit stays open before a recovery probe
    pub const CIRCUIT_RECOVERY_SECS: u64 = 30;
}

/// Strategy engine tuning
pub mod engines {
    /// Fatigue above which the bandit only serves low-intensity work
    pub const BANDIT_FATIGUE_THRESHOLD: f64 = 0.85;

    /// Hours after training a muscle group during which it is excluded by the bandit
    pub const OVERUSE_WINDOW_HOURS: i64 = 24;

    /// Beta prior increment per positive interaction
    pub const BANDIT_ALPHA_STEP: f64 = 1.0;

    /// Beta prior increment per negative interaction
    pub const BANDIT_BETA_STEP: f64 = 2.0;

    /// Popularity window for cold-start ranking
    pub const COLD_START_WINDOW_DAYS: i64 = 30;

    /// Maximum cold-start picks sharing a muscle group
    pub const COLD_START_GROUP_CAP: usize = 2;

    /// Most recent completions fed to the sequence model
    pub const SEQUENCE_WINDOW: usize = 5;

    /// Most recent completions averaged into the graph knowledge state
    pub const KNOWLEDGE_STATE_WINDOW: usize = 3;

    /// Content fallback weight for a shared muscle group
    pub const CONTENT_SAME_GROUP_WEIGHT: f64 = 0.5;

    /// Content fallback weight for a shared difficulty tier
    pub const CONTENT_SAME_DIFFICULTY_WEIGHT: f64 = 0.3;

    /// Content fallback weight per overlapping tag
    pub const CONTENT_TAG_WEIGHT: f64 = 0.1;

    /// Feature-weighted penalty per level of distance between user and item
    pub const LEVEL_DISTANCE_PENALTY: f64 = 0.15;

    /// Multiplier applied when the item's muscle group appears in the injury history
    pub const INJURY_MULTIPLIER: f64 = 0.1;

    /// Score given to complementary-group picks when the sequence model is unavailable
    pub const SEQUENCE_FALLBACK_SCORE: f64 = 0.9;
}

/// Chain planner and skill gate
pub mod planner {
    /// Probability of following the strongest transition edge
    pub const FOLLOW_PROBABILITY: f64 = 0.7;

    /// Default session length
    pub const DEFAULT_PLAN_LENGTH: usize = 4;

    /// Maximum prerequisite hops before the skill gate aborts
    pub const SKILL_GATE_MAX_DEPTH: usize = 16;

    /// Sessions between deferred transition probability recomputations
    pub const TRANSITION_RECOMPUTE_EVERY: u64 = 10;

    /// Sets per exercise for intermediate items
    pub const DEFAULT_SETS: u32 = 3;

    /// Reps per set for intermediate items
    pub const DEFAULT_REPS: u32 = 10;

    /// Sets per exercise for beginner items
    pub const BEGINNER_SETS: u32 = 2;

    /// Reps per set for beginner items
    pub const BEGINNER_REPS: u32 = 12;

    /// Sets per exercise for advanced items
    pub const ADVANCED_SETS: u32 = 4;

    /// Reps per set for advanced items
    pub const ADVANCED_REPS: u32 = 8;
}

/// User state maintenance
pub mod user_state {
    /// Default target intensity on a 1-10 scale
    pub const DEFAULT_TARGET_INTENSITY: f64 = 5.0;

    /// Daily average form score below which fatigue rises
    pub const FORM_SCORE_FATIGUE_THRESHOLD: f64 = 60.0;

    /// Fatigue added after a poor-form day
    pub const FATIGUE_INCREASE: f64 = 0.2;

    /// Fatigue recovered after a good-form day
    pub const FATIGUE_RECOVERY: f64 = 0.1;
}

/// Interaction signal strengths
pub mod signals {
    /// Signal recorded for a `like` feedback action
    pub const LIKE: f64 = 1.0;

    /// Signal recorded for any non-like feedback action
    pub const NON_LIKE_FEEDBACK: f64 = -0.5;

    /// Signal recorded for a completed exercise
    pub const FINISH: f64 = 1.0;
}

/// Inference models
pub mod models {
    /// Width of graph embeddings
    pub const GRAPH_EMBEDDING_DIM: usize = 16;

    /// Sequence model token embedding width
    pub const SEQUENCE_EMBEDDING_DIM: usize = 64;

    /// Sequence model recurrent hidden width (per direction)
    pub const SEQUENCE_HIDDEN_DIM: usize = 128;

    /// Seed used whenever weights have to be randomly initialized
    pub const RANDOM_INIT_SEED: u64 = 42;

    /// Directory searched for weight files when none is configured
    pub const DEFAULT_WEIGHTS_DIR: &str = "models";

    /// Sequence model weight file name
    pub const SEQUENCE_WEIGHTS_FILE: &str = "sequence_model.json";

    /// Graph model weight file name
    pub const GRAPH_WEIGHTS_FILE: &str = "graph_model.json";
}
