//! Contract service client errors

use closing_types::{ClosingError, ContractId};
use thiserror::Error;

/// Errors talking to the contract service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record already reached the state the request asked for
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for contract service calls
pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for ClosingError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) => {
                let status = e.status().map(|s| s.as_u16());
                ClosingError::Remote {
                    status,
                    message: e.to_string(),
                }
            }
            ClientError::Api { status, message } => ClosingError::remote_status(status, message),
            ClientError::NotFound(resource) => {
                ClosingError::ContractNotFound(ContractId::new(resource))
            }
            ClientError::Conflict(_) => ClosingError::AlreadyCompleted,
            ClientError::Json(e) => ClosingError::remote(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_becomes_a_typed_contract_id() {
        let err: ClosingError = ClientError::NotFound("c-123".to_string()).into();
        assert!(matches!(err, ClosingError::ContractNotFound(id) if id == ContractId::new("c-123")));
    }

    #[test]
    fn duplicate_finalization_is_not_retryable() {
        let err: ClosingError =
            ClientError::Conflict("contract c-1 already completed".to_string()).into();
        assert!(!err.is_retryable());
        assert!(matches!(err, ClosingError::AlreadyCompleted));
    }

    #[test]
    fn api_refusals_stay_retryable() {
        let err: ClosingError = ClientError::Api {
            status: 409,
            message: "completion refused".to_string(),
        }
        .into();
        assert!(err.is_retryable());
    }
}
