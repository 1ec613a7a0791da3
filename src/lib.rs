// ABOUTME: Main library entry point for the Pierre coaching engine
// ABOUTME: Exercise personalization, hybrid routing, and knowledge-graph workout sequencing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![deny(unsafe_code)]

//! # Pierre Coach
//!
//! Personalization and sequencing engine for strength and conditioning
//! exercises. Given a user's profile, state, and interaction history it
//! produces ranked exercise recommendations and ordered workout plans that
//! never exceed the user's skill level.
//!
//! ## Architecture
//!
//! - **Catalog**: exercise store, prerequisite graph snapshot, transition statistics
//! - **Ledger**: append-only interaction events with incremental bandit counters
//! - **Strategies**: six scoring engines behind one async trait
//! - **Router**: scenario → engine mix, fan-out, merge, backfill, persistence
//! - **Skill gate / Planner**: level-safe substitution and transition-walk plans
//! - **Oracle / Inference**: vector search behind a deadline and loaded model weights
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pierre_coach::catalog::CatalogFixture;
//! use pierre_coach::config::CoachConfig;
//! use pierre_coach::service::CoachService;
//! use pierre_coach::models::Scenario;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fixture = CatalogFixture::from_path("demos/catalog.json").await?;
//!     let service = CoachService::from_fixture(CoachConfig::from_env()?, &fixture, None).await?;
//!
//!     let batch = service
//!         .get_recommendations(Uuid::new_v4(), Scenario::Default, Some(5))
//!         .await?;
//!     println!("{} recommendations", batch.items.len());
//!     Ok(())
//! }
//! ```

/// Exercise catalog stores, graph snapshot, and transitions
pub mod catalog;

/// Configuration management loaded from environment
pub mod config;

/// Model weights, item index, and inference
pub mod inference;

/// Interaction ledger
pub mod ledger;

/// Structured logging setup
pub mod logging;

/// Vector-similarity oracle and its guard
pub mod oracle;

/// Chain planner
pub mod planner;

/// Hybrid router and recommendation persistence
pub mod router;

/// Service facade
pub mod service;

/// Skill gate
pub mod skill_gate;

/// Strategy engines
pub mod strategies;

/// User profile and state stores
pub mod users;

// Re-export foundation crate modules so callers need a single dependency
pub use pierre_coach_core::{constants, errors, models};
