// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the hookrelay workspace.

use thiserror::Error;

/// The primary error type used across adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A uniqueness or foreign-key constraint rejected a write.
    #[error("constraint violation: {message}")]
    Conflict { message: String },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Input failed semantic validation. Carries every collected problem.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Outbound HTTP delivery errors (client construction, transport failure).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RelayError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true when the error came from a rejected constraint.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RelayError::Conflict { .. })
    }
}
