// ABOUTME: Domain models shared by stores, strategy engines, router, and planner
// ABOUTME: Re-exports catalog, interaction, user, recommendation, and plan types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Exercise catalog items and graph edges
pub mod catalog;
/// Interaction ledger events and aggregates
pub mod interaction;
/// Ordered workout plans
pub mod plan;
/// Persisted recommendations and scenario tags
pub mod recommendation;
/// User profile and recommendation state
pub mod user;

pub use catalog::{
    CatalogItem, DifficultyTier, Equipment, ItemId, MuscleGroup, PrerequisiteEdge, TransitionEdge,
    STRETCH_TAGS,
};
pub use interaction::{ArmCounts, InteractionEvent, InteractionKind, ItemEngagement};
pub use plan::{Plan, PlanEntry};
pub use recommendation::{Recommendation, RecommendationBatch, Scenario, StrategyKind};
pub use user::{FitnessGoal, Gender, TrainedGroup, UserProfile, UserState};
