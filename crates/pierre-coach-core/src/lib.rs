// ABOUTME: Core types and constants for the Pierre coaching engine
// ABOUTME: Foundation crate with error handling, domain models, and tuning constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Coach Core
//!
//! Foundation crate providing the shared vocabulary of the coaching engine:
//! catalog items and their edges, interaction events, user state, persisted
//! recommendations, and workout plans. Nothing in here performs I/O, which
//! keeps the crate cheap to depend on from stores, engines, and binaries.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and the
//!   recommendation-specific degradation taxonomy
//! - **constants**: Default thresholds, windows, and weights
//! - **models**: Catalog, ledger, user, recommendation, and plan types

/// Unified error handling system with standard error codes
pub mod errors;

/// Default thresholds, windows, and weights organized by component
pub mod constants;

/// Core data models (catalog items, interactions, user state, recommendations, plans)
pub mod models;
