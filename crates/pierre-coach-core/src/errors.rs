// ABOUTME: Unified error types for the coaching engine with stable error codes
// ABOUTME: Covers validation, storage, and the recommendation degradation taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the workspace returns [`AppResult`]. Errors carry
//! an [`ErrorCode`] so callers can map them onto transport status codes without
//! string matching.
//!
//! Recommendation and planning code additionally distinguishes the recoverable
//! degradation cases with [`RecommendationError`]. Those are normally handled
//! locally (fallback scoring, `ColdStart` backfill) and only reach the caller
//! when a lower layer is misconfigured.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ItemId;

/// Standard error codes used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Resource Management (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,

    // External Services (5000-5999)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout = 5004,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Recommendation pipeline (7000-7999)
    #[serde(rename = "DATA_UNAVAILABLE")]
    DataUnavailable = 7000,
    #[serde(rename = "MODEL_UNAVAILABLE")]
    ModelUnavailable = 7001,
    #[serde(rename = "STRUCTURAL_ANOMALY")]
    StructuralAnomaly = 7002,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// HTTP status code an outer transport should use for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::ResourceNotFound => 404,
            Self::ExternalServiceError => 502,
            Self::DataUnavailable | Self::ModelUnavailable | Self::ExternalServiceTimeout => 503,
            Self::ConfigInvalid
            | Self::StructuralAnomaly
            | Self::InternalError
            | Self::StorageError
            | Self::SerializationError => 500,
        }
    }

    /// User-facing description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceTimeout => "An external service did not answer in time",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::DataUnavailable => "Not enough data to personalize this request",
            Self::ModelUnavailable => "The requested model is not loaded",
            Self::StructuralAnomaly => "The exercise graph contains an inconsistent structure",
            Self::InternalError => "An internal error occurred",
            Self::StorageError => "Storage operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// User the failing operation was performed for
    pub user_id: Option<Uuid>,
    /// Resource identifier if applicable
    pub resource_id: Option<String>,
}

/// Unified error type for the engine
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a user ID to the error context
    #[must_use]
    pub const fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context.user_id = Some(user_id);
        self
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage layer error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorCode::StorageError, error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Recoverable failures of the personalization pipeline.
///
/// Each variant has a documented local recovery; see the engine that raises it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecommendationError {
    /// The user's history has nothing the engine can start from
    #[error("no data available: {reason}")]
    DataUnavailable {
        /// What was missing
        reason: String,
    },
    /// The vector-similarity oracle did not answer within its deadline
    #[error("vector search timed out after {elapsed:?}")]
    OracleTimeout {
        /// Configured deadline that elapsed
        elapsed: Duration,
    },
    /// The vector-similarity oracle answered with an error
    #[error("vector search failed: {message}")]
    OracleError {
        /// Oracle-provided message
        message: String,
    },
    /// Learned weights or the id/index mapping are not loaded
    #[error("model '{model}' unavailable: {reason}")]
    ModelUnavailable {
        /// Model name
        model: String,
        /// Why it could not be used
        reason: String,
    },
    /// The prerequisite walk hit a cycle or its depth bound
    #[error("prerequisite walk from item {origin} aborted: {detail}")]
    StructuralAnomaly {
        /// Item the walk started from
        origin: ItemId,
        /// Cycle path or depth information
        detail: String,
    },
}

impl RecommendationError {
    /// Error code for this degradation case
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DataUnavailable { .. } => ErrorCode::DataUnavailable,
            Self::OracleTimeout { .. } => ErrorCode::ExternalServiceTimeout,
            Self::OracleError { .. } => ErrorCode::ExternalServiceError,
            Self::ModelUnavailable { .. } => ErrorCode::ModelUnavailable,
            Self::StructuralAnomaly { .. } => ErrorCode::StructuralAnomaly,
        }
    }
}

impl From<RecommendationError> for AppError {
    fn from(error: RecommendationError) -> Self {
        Self::new(error.code(), error.to_string()).with_source(error)
    }
}
