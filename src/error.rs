use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("activity not found: {id}")]
    NotFound { id: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

impl TrackerError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        TrackerError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        TrackerError::NotFound { id: id.into() }
    }
}
