//! Error types for the sale completion workflow
//!
//! Every failure carries its handling class. Validation problems surface
//! inline and are recoverable by editing; remote failures are retryable;
//! an incomplete create response is fatal for the attempt; a gate refusal
//! means nothing was sent at all.

use crate::{ContractId, LeadId};

/// Errors that can occur while completing a sale
#[derive(Debug, thiserror::Error)]
pub enum ClosingError {
    /// Client-side payload problem, fixable by editing the draft
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport or server failure talking to the contract service
    #[error("Contract service error: {message}")]
    Remote {
        /// HTTP status when the server answered, `None` for transport faults
        status: Option<u16>,
        message: String,
    },

    /// The create call reported success but the record is missing its id
    /// or signing URL; the attempt is void and the workflow returns to Edit
    #[error("Contract service returned an incomplete record: {0}")]
    IncompleteResponse(String),

    /// The local completion precondition failed; no remote call was made
    #[error("Completion gate not satisfied: {0}")]
    GateNotSatisfied(String),

    #[error("Contract not found: {0}")]
    ContractNotFound(ContractId),

    #[error("No active contract for lead: {0}")]
    NoActiveContract(LeadId),

    #[error("Operation '{action}' not allowed in phase {phase}")]
    InvalidPhase { action: String, phase: String },

    #[error("Workflow already completed")]
    AlreadyCompleted,

    #[error("Draft store error: {0}")]
    Store(String),
}

impl ClosingError {
    /// Remote failure without an HTTP status (transport fault, decode fault)
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Remote failure with the HTTP status the server answered with
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Check whether retrying the same call can plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Result type alias for sale completion operations
pub type ClosingResult<T> = Result<T, ClosingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_errors_are_retryable() {
        assert!(ClosingError::remote("connection reset").is_retryable());
        assert!(ClosingError::remote_status(503, "unavailable").is_retryable());
        assert!(!ClosingError::Validation("name".to_string()).is_retryable());
        assert!(!ClosingError::IncompleteResponse("no signing_url".to_string()).is_retryable());
        assert!(!ClosingError::GateNotSatisfied("payment pending".to_string()).is_retryable());
        assert!(!ClosingError::AlreadyCompleted.is_retryable());
    }

    #[test]
    fn display_carries_the_reason() {
        let err = ClosingError::GateNotSatisfied("payment is pending".to_string());
        assert_eq!(
            err.to_string(),
            "Completion gate not satisfied: payment is pending"
        );
    }
}
