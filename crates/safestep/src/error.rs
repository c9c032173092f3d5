//! Error types for safestep.
//!
//! This module defines all error types used throughout the safestep crate.
//! Domain failures (validation, missing records, illegal transitions, conflicts)
//! sit next to infrastructure failures so every layer can propagate with `?`,
//! and the boundary adapter can map each variant onto a response category.

use std::path::PathBuf;
use thiserror::Error;

use crate::trip::TripStatus;

/// The main error type for safestep operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// Input was malformed or semantically invalid. Never mutates state.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{message}")]
    NotFound {
        /// Description of the missing record.
        message: String,
    },

    /// The operation is not permitted in the trip's current status.
    #[error("cannot {action} trip {id}: trip is {status}")]
    InvalidTransition {
        /// Trip the operation targeted.
        id: String,
        /// Status the trip was in.
        status: TripStatus,
        /// The rejected operation.
        action: &'static str,
    },

    /// Starting a trip would create a second active trip.
    #[error("trip {active_id} is already in progress")]
    Conflict {
        /// The trip that is currently active.
        active_id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === IPC Errors ===
    /// Failed to connect to the daemon.
    #[error("failed to connect to daemon at {path}: {message}")]
    DaemonConnect {
        /// Path to the socket file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// IPC communication failed.
    #[error("IPC error: {0}")]
    Ipc(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for safestep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How an error is surfaced across the request/response boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad input.
    Validation,
    /// Unknown record or route.
    NotFound,
    /// Single-active-trip violation.
    Conflict,
    /// Operation not allowed in the current trip status.
    InvalidTransition,
    /// Anything the caller cannot fix.
    Internal,
}

impl ErrorCategory {
    /// Response status code for this category.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidTransition => 422,
            Self::Internal => 500,
        }
    }

    /// Stable machine-readable name used in error bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidTransition => "invalid_transition",
            Self::Internal => "internal",
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for a record of the given kind.
    #[must_use]
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::NotFound {
            message: format!("{kind} not found: {id}"),
        }
    }

    /// Create the not-found error used when no trip is in progress.
    #[must_use]
    pub fn no_active_trip() -> Self {
        Self::NotFound {
            message: "no active trip".to_string(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new IPC error.
    #[must_use]
    pub fn ipc(message: impl Into<String>) -> Self {
        Self::Ipc(message.into())
    }

    /// Boundary category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::InvalidTransition { .. } => ErrorCategory::InvalidTransition,
            _ => ErrorCategory::Internal,
        }
    }

    /// Response status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Check if this error is a validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error reports a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is an illegal status transition.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Check if this error is an active-trip conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
