//! Draft store error domain.

use closing_types::ClosingError;
use thiserror::Error;

/// Result alias for draft store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by draft store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ClosingError {
    fn from(err: StoreError) -> Self {
        ClosingError::Store(err.to_string())
    }
}
