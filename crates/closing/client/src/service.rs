use crate::ClientResult;
use async_trait::async_trait;
use closing_types::{Contract, ContractDraft, ContractId, DraftFields, LeadId, SignatureImage};
use serde::{Deserialize, Serialize};

/// Payload for creating a contract from a finished draft
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateContract {
    pub lead_id: LeadId,
    pub fields: DraftFields,
}

impl CreateContract {
    pub fn from_draft(draft: &ContractDraft) -> Self {
        Self {
            lead_id: draft.lead_id.clone(),
            fields: draft.fields.clone(),
        }
    }
}

/// What the service reports after dispatching a delivery email
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Address the delivery actually went to
    pub sent_to: String,
    /// Number of attachments included
    pub attachments: u32,
}

/// Evidence submitted with the completion call
///
/// The service re-validates the completion gate on its side. A signature
/// captured on the in-studio pad travels here, since the service has not
/// seen it through the signing link.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompletionAttestation {
    pub signed_locally: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureImage>,
}

impl CompletionAttestation {
    /// The customer signed through the remote signing link
    pub fn remote() -> Self {
        Self::default()
    }

    /// The customer signed on the in-studio pad
    pub fn local(signature: SignatureImage) -> Self {
        Self {
            signed_locally: true,
            signature: Some(signature),
        }
    }
}

/// The remote contract service seam.
///
/// Every implementation owns the authoritative `Contract` records. The
/// workflow only ever mirrors what these calls return.
#[async_trait]
pub trait ContractService: Send + Sync {
    /// Create a contract for a lead. A lead with an active contract gets
    /// the existing record back instead of a duplicate.
    async fn create(&self, payload: &CreateContract) -> ClientResult<Contract>;

    /// Fetch the current snapshot of a contract.
    async fn get(&self, id: &ContractId) -> ClientResult<Contract>;

    /// Send the signing link to the customer.
    async fn send_email(&self, id: &ContractId, to: &str) -> ClientResult<()>;

    /// Dispatch (or re-dispatch) the final delivery email.
    async fn resend_delivery(&self, id: &ContractId, to: &str) -> ClientResult<DeliveryReceipt>;

    /// Attach a signing auth code to the contract.
    async fn set_auth_code(&self, id: &ContractId, code: &str) -> ClientResult<()>;

    /// Finalize the sale. The service re-validates the completion gate and
    /// returns the final contract snapshot.
    async fn complete(
        &self,
        id: &ContractId,
        attestation: &CompletionAttestation,
    ) -> ClientResult<Contract>;
}
