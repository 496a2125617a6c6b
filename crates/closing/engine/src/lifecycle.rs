//! Forward-only contract transitions
//!
//! Wraps the service calls that move a contract through its lifecycle and
//! checks the local preconditions first, so a refused transition never
//! produces network traffic.

use crate::gate::CompletionGate;
use closing_client::{CompletionAttestation, ContractService, CreateContract};
use closing_types::{ClosingError, ClosingResult, Contract, ContractDraft};
use std::sync::Arc;

/// Drives a contract from Draft through Sent to Signed.
///
/// Transitions only move forward. Regressions observed remotely are the
/// poller's to report; this controller never writes one.
pub struct LifecycleController {
    service: Arc<dyn ContractService>,
}

impl LifecycleController {
    pub fn new(service: Arc<dyn ContractService>) -> Self {
        Self { service }
    }

    /// Create the remote contract from a reviewed draft.
    ///
    /// A success response missing its id or signing URL is treated as a
    /// failed create: the record cannot be signed, so the attempt is void.
    pub async fn create(&self, draft: &ContractDraft) -> ClosingResult<Contract> {
        draft.validate()?;

        let payload = CreateContract::from_draft(draft);
        let contract = self.service.create(&payload).await?;

        if contract.id.0.is_empty() {
            return Err(ClosingError::IncompleteResponse(
                "created contract has no id".to_string(),
            ));
        }
        if contract.signing_url.trim().is_empty() {
            return Err(ClosingError::IncompleteResponse(format!(
                "contract {} has no signing url",
                contract.id
            )));
        }

        tracing::info!(
            contract_id = %contract.id,
            lead_id = %contract.lead_id,
            "Contract created"
        );
        Ok(contract)
    }

    /// Send the signing link to the customer.
    pub async fn send(&self, contract: &Contract, to: &str) -> ClosingResult<()> {
        if to.trim().is_empty() {
            return Err(ClosingError::Validation(
                "signing link needs a destination address".to_string(),
            ));
        }
        if contract.is_signed() {
            return Err(ClosingError::InvalidPhase {
                action: "send_contract".to_string(),
                phase: "signed".to_string(),
            });
        }

        self.service.send_email(&contract.id, to).await?;
        tracing::info!(contract_id = %contract.id, to = %to, "Signing link sent");
        Ok(())
    }

    /// Finalize the sale once the completion gate clears.
    ///
    /// The gate is checked locally before the call; on refusal the service
    /// never hears about the attempt.
    pub async fn complete(
        &self,
        contract: &Contract,
        attestation: &CompletionAttestation,
    ) -> ClosingResult<Contract> {
        if let Some(reason) = CompletionGate::refusal_reason(contract, attestation.signed_locally) {
            return Err(ClosingError::GateNotSatisfied(reason));
        }

        let finished = self.service.complete(&contract.id, attestation).await?;
        tracing::info!(contract_id = %finished.id, "Sale completed");
        Ok(finished)
    }
}
