//! Error types for the reference store.

use crate::model::ReferenceType;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RefError>;

/// Errors from reference store operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The entity or image does not exist.
    #[error("Reference not found: {0}")]
    NotFound(String),

    /// I/O failure, malformed metadata, or a permission problem.
    #[error("Storage error: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageCause,
    },

    /// A field violated its constraints.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The name was rejected by the per-type naming pattern at create time.
    #[error("Invalid name format for {ref_type}: {name}")]
    InvalidName { ref_type: ReferenceType, name: String },

    /// A reference with this (type, name) is already stored.
    #[error("Reference already exists: {0}")]
    AlreadyExists(String),
}

/// The underlying cause of a [`RefError::Storage`].
#[derive(Debug, Error)]
pub enum StorageCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The file parsed as JSON but is not a valid reference record.
    #[error("malformed metadata: {0}")]
    Malformed(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl RefError {
    /// Wrap an underlying failure with a short description of what was attempted.
    pub fn storage(context: impl Into<String>, source: impl Into<StorageCause>) -> Self {
        RefError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Build a not-found error for a `(type, name)` pair.
    pub fn not_found(ref_type: ReferenceType, name: &str) -> Self {
        RefError::NotFound(format!("{ref_type}/{name}"))
    }

    /// True when the entity or image is missing (as opposed to broken).
    pub fn is_not_found(&self) -> bool {
        matches!(self, RefError::NotFound(_))
    }

    /// True when the error came from the filesystem or a parse failure.
    pub fn is_storage(&self) -> bool {
        matches!(self, RefError::Storage { .. })
    }
}
