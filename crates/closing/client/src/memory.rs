//! In-process contract authority.
//!
//! Behaves like the hosted service without a network: one active contract
//! per lead, server-side gate re-validation on complete, and knobs to
//! script signatures, payments, delivery outcomes, and failures. Tests
//! and the demo drive the whole workflow against this implementation.

use crate::service::{CompletionAttestation, ContractService, CreateContract, DeliveryReceipt};
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use chrono::Utc;
use closing_types::{
    Contract, ContractId, ContractStatus, LeadId, PaymentStatus, SignatureStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct ServiceState {
    contracts: HashMap<ContractId, Contract>,
    /// Active (created, not completed) contract per lead
    by_lead: HashMap<LeadId, ContractId>,
    completed: HashSet<ContractId>,
    auth_codes: HashMap<ContractId, String>,
}

/// In-memory contract service.
pub struct MemoryContractService {
    state: RwLock<ServiceState>,
    get_calls: AtomicUsize,
    fail_next_create: AtomicBool,
    fail_next_send: AtomicBool,
    fail_next_resend: AtomicBool,
    fail_gets_remaining: AtomicUsize,
    omit_signing_url: AtomicBool,
    attachment_count: AtomicU32,
}

impl MemoryContractService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ServiceState::default()),
            get_calls: AtomicUsize::new(0),
            fail_next_create: AtomicBool::new(false),
            fail_next_send: AtomicBool::new(false),
            fail_next_resend: AtomicBool::new(false),
            fail_gets_remaining: AtomicUsize::new(0),
            omit_signing_url: AtomicBool::new(false),
            attachment_count: AtomicU32::new(1),
        }
    }

    // ── Simulation Controls ──────────────────────────────────────────

    /// Make the next create call answer 503.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make the next send call answer 502.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Make the next delivery resend answer 502.
    pub fn fail_next_resend(&self) {
        self.fail_next_resend.store(true, Ordering::SeqCst);
    }

    /// Make the next `n` get calls answer 502.
    pub fn fail_gets(&self, n: usize) {
        self.fail_gets_remaining.store(n, Ordering::SeqCst);
    }

    /// Make the next create response come back without a signing URL.
    pub fn omit_signing_url_once(&self) {
        self.omit_signing_url.store(true, Ordering::SeqCst);
    }

    /// Attachments reported on delivery dispatches.
    pub fn set_attachment_count(&self, n: u32) {
        self.attachment_count.store(n, Ordering::SeqCst);
    }

    /// Simulate the customer signing through the remote link.
    pub async fn mark_signed(&self, id: &ContractId) {
        let mut state = self.state.write().await;
        if let Some(contract) = state.contracts.get_mut(id) {
            contract.status = ContractStatus::Signed;
            contract.signature_status = SignatureStatus::Signed;
            contract.signed_at = Some(Utc::now());
            contract.updated_at = Utc::now();
        }
    }

    /// Simulate the payment sub-flow recording a payment state.
    pub async fn mark_payment(&self, id: &ContractId, status: PaymentStatus) {
        let mut state = self.state.write().await;
        if let Some(contract) = state.contracts.get_mut(id) {
            contract.payment_status = status;
            contract.updated_at = Utc::now();
        }
    }

    /// Simulate the service resolving the automatic delivery email.
    pub async fn resolve_delivery(&self, id: &ContractId, delivered: bool, error: Option<&str>) {
        let mut state = self.state.write().await;
        if let Some(contract) = state.contracts.get_mut(id) {
            contract.delivery_email.sent = Some(delivered);
            contract.delivery_email.sent_at = Some(Utc::now());
            contract.delivery_email.error = error.map(str::to_string);
            contract.updated_at = Utc::now();
        }
    }

    // ── Test Introspection ───────────────────────────────────────────

    /// How many get calls the service has answered or failed.
    pub fn get_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Current stored snapshot of a contract.
    pub async fn contract(&self, id: &ContractId) -> Option<Contract> {
        self.state.read().await.contracts.get(id).cloned()
    }

    /// The active contract id for a lead, if one exists.
    pub async fn active_contract_for(&self, lead_id: &LeadId) -> Option<ContractId> {
        self.state.read().await.by_lead.get(lead_id).cloned()
    }

    /// The auth code stored for a contract, if any.
    pub async fn auth_code(&self, id: &ContractId) -> Option<String> {
        self.state.read().await.auth_codes.get(id).cloned()
    }
}

impl Default for MemoryContractService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractService for MemoryContractService {
    async fn create(&self, payload: &CreateContract) -> ClientResult<Contract> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 503,
                message: "contract service unavailable".to_string(),
            });
        }

        let mut state = self.state.write().await;

        // One active contract per lead: a repeat create returns the
        // existing record instead of minting a duplicate.
        if let Some(existing_id) = state.by_lead.get(&payload.lead_id).cloned() {
            if let Some(existing) = state.contracts.get(&existing_id) {
                tracing::debug!(
                    lead_id = %payload.lead_id,
                    contract_id = %existing_id,
                    "Create for lead with active contract, returning existing record"
                );
                return Ok(existing.clone());
            }
        }

        let id = ContractId::generate();
        let signing_url = if self.omit_signing_url.swap(false, Ordering::SeqCst) {
            String::new()
        } else {
            format!("https://sign.shutterdesk.test/{}", id)
        };
        let contract = Contract::new(id.clone(), payload.lead_id.clone(), signing_url);

        state.by_lead.insert(payload.lead_id.clone(), id.clone());
        state.contracts.insert(id, contract.clone());
        Ok(contract)
    }

    async fn get(&self, id: &ContractId) -> ClientResult<Contract> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_gets_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_gets_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ClientError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }

        self.state
            .read()
            .await
            .contracts
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    async fn send_email(&self, id: &ContractId, to: &str) -> ClientResult<()> {
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 502,
                message: "mail relay refused".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let contract = state
            .contracts
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        if contract.status == ContractStatus::Draft {
            contract.status = ContractStatus::Sent;
        }
        if contract.signature_status == SignatureStatus::Pending {
            contract.signature_status = SignatureStatus::Sent;
        }
        contract.updated_at = Utc::now();
        tracing::debug!(contract_id = %id, to = %to, "Signing link sent");
        Ok(())
    }

    async fn resend_delivery(&self, id: &ContractId, to: &str) -> ClientResult<DeliveryReceipt> {
        if self.fail_next_resend.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 502,
                message: "delivery relay refused".to_string(),
            });
        }

        let attachments = self.attachment_count.load(Ordering::SeqCst);
        let mut state = self.state.write().await;
        let contract = state
            .contracts
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        contract.delivery_email.sent = Some(true);
        contract.delivery_email.sent_at = Some(Utc::now());
        contract.delivery_email.to = Some(to.to_string());
        contract.delivery_email.error = None;
        contract.delivery_email.attachment_count = attachments;
        contract.updated_at = Utc::now();

        Ok(DeliveryReceipt {
            sent_to: to.to_string(),
            attachments,
        })
    }

    async fn set_auth_code(&self, id: &ContractId, code: &str) -> ClientResult<()> {
        let mut state = self.state.write().await;
        if !state.contracts.contains_key(id) {
            return Err(ClientError::NotFound(id.to_string()));
        }
        state.auth_codes.insert(id.clone(), code.to_string());
        Ok(())
    }

    async fn complete(
        &self,
        id: &ContractId,
        attestation: &CompletionAttestation,
    ) -> ClientResult<Contract> {
        let mut state = self.state.write().await;

        if state.completed.contains(id) {
            return Err(ClientError::Conflict(format!(
                "contract {} already completed",
                id
            )));
        }

        let contract = state
            .contracts
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;

        // Server-side re-validation of the completion gate. Answers 409
        // rather than the typed conflict: the caller may retry once the
        // payment or signature lands.
        let signed =
            contract.signature_status == SignatureStatus::Signed || attestation.signed_locally;
        if contract.payment_status != PaymentStatus::Paid || !signed {
            return Err(ClientError::Api {
                status: 409,
                message: format!(
                    "completion refused: payment {:?}, signature {:?}",
                    contract.payment_status, contract.signature_status
                ),
            });
        }

        if attestation.signed_locally && contract.signature_status != SignatureStatus::Signed {
            contract.status = ContractStatus::Signed;
            contract.signature_status = SignatureStatus::Signed;
            contract.signed_at = Some(Utc::now());
        }
        contract.updated_at = Utc::now();
        let snapshot = contract.clone();
        let lead_id = snapshot.lead_id.clone();

        state.completed.insert(id.clone());
        state.by_lead.remove(&lead_id);
        Ok(snapshot)
    }
}
