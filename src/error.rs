//! Error types for the batch orchestrator.
//!

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigurationError;
use crate::execution::cursor::CursorError;
use crate::execution::executor::ExecutorError;

/// Per-entity validation failures
///
/// These never abort a run. The builder records the entity as skipped and
/// moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Entity has an empty id")]
    MissingId,

    #[error("Entity {id} has an empty payload")]
    EmptyPayload { id: String },

    #[error("Payload for entity {id} is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge { id: String, size: usize, limit: usize },

    #[error("Line {line} is not a recognizable update statement")]
    MalformedStatement { line: usize },
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl BatchError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BatchResult<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::PayloadTooLarge {
            id: "42".to_string(),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Payload for entity 42 is 2048 bytes, exceeding the 1024 byte limit"
        );

        let wrapped: BatchError = err.into();
        assert!(wrapped.to_string().starts_with("Validation error:"));
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = BatchError::io(
            "out/batch-001.sql",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("out/batch-001.sql"));
        assert!(message.contains("denied"));
    }
}
