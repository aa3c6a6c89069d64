use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;

/// Message shown to end users for any storage failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "The operation could not be completed. Please try again.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors raised by the lifecycle operations.
///
/// Every variant aborts the unit of work it was raised in.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Malformed or missing input, or a transition outside the allowed table.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A precondition no longer holds because of concurrent state.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Underlying storage or transaction failure.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user must fix the input.
    Validation,
    /// The user should refresh and retry.
    Conflict,
    /// Generic failure; retry later.
    Persistence,
}

impl LifecycleError {
    pub fn validation(message: impl Into<String>) -> Self {
        LifecycleError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LifecycleError::Conflict {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Validation { .. } | LifecycleError::NotFound { .. } => {
                ErrorKind::Validation
            }
            LifecycleError::Conflict { .. } => ErrorKind::Conflict,
            LifecycleError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Message safe to show to an end user. Storage internals never leak.
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::Validation { message } | LifecycleError::Conflict { message } => {
                message.clone()
            }
            LifecycleError::NotFound { .. } => self.to_string(),
            LifecycleError::Persistence(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(e: rusqlite::Error) -> Self {
        LifecycleError::Persistence(DatabaseError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            LifecycleError::validation("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(LifecycleError::conflict("stale").kind(), ErrorKind::Conflict);
        assert_eq!(
            LifecycleError::NotFound {
                entity: "Record",
                id: 3
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LifecycleError::Persistence(DatabaseError::LockPoisoned).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_user_message_hides_storage_details() {
        let err = LifecycleError::Persistence(DatabaseError::Migration {
            version: 3,
            reason: "no such table: records".to_string(),
        });
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!err.user_message().contains("records"));

        let err = LifecycleError::validation("Remarks are required when rejecting");
        assert_eq!(err.user_message(), "Remarks are required when rejecting");

        let err = LifecycleError::NotFound {
            entity: "Disposal request",
            id: 42,
        };
        assert_eq!(err.user_message(), "Disposal request 42 not found");
    }
}
