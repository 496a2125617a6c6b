//! The shared view of one sale in progress
//!
//! Exactly one `SaleView` exists per orchestrator, behind a lock both the
//! status poller and operator actions go through. Remote snapshots are
//! applied whole inside one critical section, so a half-applied update
//! can never be observed.

use closing_types::{
    Contract, ContractDraft, DeliveryState, LeadId, SaleEvent, SignatureImage, WorkflowStep,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Sale Phase ───────────────────────────────────────────────────────

/// Where the workflow currently stands
///
/// Two-tier by design: before `Created` only a draft exists and local
/// state is the truth; from `Created` on, the remote contract record is
/// authoritative and the draft merely remembers the step and the link to
/// the record.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub enum SalePhase {
    /// No lead opened
    #[default]
    Idle,
    /// A stored draft was found; the operator decides resume or discard
    ResumePrompt { draft: ContractDraft },
    /// Editing or reviewing; no remote contract yet
    Drafting { draft: ContractDraft },
    /// The remote contract exists; sending, signing, delivery
    Created {
        draft: ContractDraft,
        contract: Contract,
    },
    /// Terminal
    Completed { contract: Contract },
}

impl SalePhase {
    /// Short name used in logs and phase-guard errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResumePrompt { .. } => "resume_prompt",
            Self::Drafting { .. } => "drafting",
            Self::Created { .. } => "created",
            Self::Completed { .. } => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn draft(&self) -> Option<&ContractDraft> {
        match self {
            Self::ResumePrompt { draft } | Self::Drafting { draft } => Some(draft),
            Self::Created { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn contract(&self) -> Option<&Contract> {
        match self {
            Self::Created { contract, .. } | Self::Completed { contract } => Some(contract),
            _ => None,
        }
    }

    pub(crate) fn contract_mut(&mut self) -> Option<&mut Contract> {
        match self {
            Self::Created { contract, .. } | Self::Completed { contract } => Some(contract),
            _ => None,
        }
    }
}

// ── Sale View ────────────────────────────────────────────────────────

/// Everything a host surface needs to render the workflow
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SaleView {
    pub phase: SalePhase,
    /// Signature captured on the in-studio pad this session, if any.
    /// Session-scoped: cleared on close and lead switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_signature: Option<SignatureImage>,
    /// Where the signing link last went, locally recorded on send
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_link_sent_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_link_sent_at: Option<DateTime<Utc>>,
}

impl SaleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lead_id(&self) -> Option<&LeadId> {
        self.phase
            .draft()
            .map(|d| &d.lead_id)
            .or_else(|| self.phase.contract().map(|c| &c.lead_id))
    }

    pub fn step(&self) -> Option<WorkflowStep> {
        self.phase.draft().map(|d| d.step)
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.phase.contract()
    }

    pub fn local_signature_captured(&self) -> bool {
        self.local_signature.is_some()
    }

    /// Delivery rendering for the current contract
    pub fn delivery_state(&self) -> DeliveryState {
        self.phase
            .contract()
            .map(|c| c.delivery_email.state())
            .unwrap_or(DeliveryState::Pending)
    }

    /// Whether the status poller still has work: the workflow sits at the
    /// Send step and either the signature or the delivery outcome is
    /// unresolved
    pub fn polling_required(&self) -> bool {
        match &self.phase {
            SalePhase::Created { draft, contract } => {
                draft.step.is_send() && (!contract.is_signed() || !contract.delivery_resolved())
            }
            _ => false,
        }
    }

    /// Apply a remote snapshot atomically and report observed transitions.
    ///
    /// The whole record replaces the cached one; remote wins on every
    /// field. Returns the events the diff reveals so the caller can
    /// broadcast them outside the lock.
    pub fn apply_remote(&mut self, remote: Contract) -> Vec<SaleEvent> {
        let mut events = Vec::new();

        let SalePhase::Created { contract, .. } = &mut self.phase else {
            tracing::warn!(
                phase = self.phase.name(),
                contract_id = %remote.id,
                "Dropping remote snapshot outside the created phase"
            );
            return events;
        };

        if contract.id != remote.id {
            tracing::warn!(
                expected = %contract.id,
                received = %remote.id,
                "Dropping remote snapshot for a different contract"
            );
            return events;
        }

        if !remote.signature_consistent() {
            tracing::warn!(
                contract_id = %remote.id,
                "Remote snapshot marks the contract signed without a signed signature status"
            );
        }

        if contract.signature_status != remote.signature_status {
            events.push(SaleEvent::SignatureObserved {
                contract_id: remote.id.clone(),
                status: remote.signature_status,
            });
        }
        if contract.payment_status != remote.payment_status {
            events.push(SaleEvent::PaymentObserved {
                contract_id: remote.id.clone(),
                status: remote.payment_status,
            });
        }
        if !contract.delivery_resolved() && remote.delivery_resolved() {
            events.push(SaleEvent::DeliveryResolved {
                contract_id: remote.id.clone(),
                delivered: remote.delivery_email.sent == Some(true),
            });
        }

        *contract = remote;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closing_types::{ContractId, ContractStatus, DraftFields, PaymentStatus, SignatureStatus};

    fn make_created_view() -> SaleView {
        let mut fields = DraftFields::default();
        fields.customer.name = "Dana Reyes".to_string();
        let mut draft = ContractDraft::new(LeadId::new("lead-1")).with_fields(fields);
        let contract = Contract::new(
            ContractId::new("c-1"),
            LeadId::new("lead-1"),
            "https://sign.example.com/c-1",
        );
        draft.attach_contract(contract.id.clone());

        SaleView {
            phase: SalePhase::Created { draft, contract },
            ..SaleView::default()
        }
    }

    fn remote_snapshot(view: &SaleView) -> Contract {
        view.contract().cloned().unwrap()
    }

    #[test]
    fn polling_required_until_signed_and_delivered() {
        let mut view = make_created_view();
        assert!(view.polling_required());

        let mut remote = remote_snapshot(&view);
        remote.status = ContractStatus::Signed;
        remote.signature_status = SignatureStatus::Signed;
        view.apply_remote(remote);
        // Signed, but delivery still unresolved
        assert!(view.polling_required());

        let mut remote = remote_snapshot(&view);
        remote.delivery_email.sent = Some(true);
        view.apply_remote(remote);
        assert!(!view.polling_required());
    }

    #[test]
    fn apply_remote_reports_transitions_once() {
        let mut view = make_created_view();

        let mut remote = remote_snapshot(&view);
        remote.status = ContractStatus::Signed;
        remote.signature_status = SignatureStatus::Signed;
        remote.payment_status = PaymentStatus::Paid;

        let events = view.apply_remote(remote.clone());
        assert_eq!(events.len(), 2);

        // The same snapshot again diffs to nothing
        let events = view.apply_remote(remote);
        assert!(events.is_empty());
    }

    #[test]
    fn apply_remote_replaces_the_whole_record() {
        let mut view = make_created_view();

        let mut remote = remote_snapshot(&view);
        remote.payment_status = PaymentStatus::Partial;
        remote.delivery_email.sent = Some(false);
        remote.delivery_email.error = Some("mailbox full".to_string());
        let events = view.apply_remote(remote);

        let contract = view.contract().unwrap();
        assert_eq!(contract.payment_status, PaymentStatus::Partial);
        assert_eq!(contract.delivery_email.error.as_deref(), Some("mailbox full"));
        assert_eq!(view.delivery_state(), DeliveryState::Failed);
        assert!(events.contains(&SaleEvent::DeliveryResolved {
            contract_id: ContractId::new("c-1"),
            delivered: false,
        }));
    }

    #[test]
    fn snapshots_for_other_contracts_are_dropped() {
        let mut view = make_created_view();
        let stranger = Contract::new(
            ContractId::new("c-other"),
            LeadId::new("lead-1"),
            "https://sign.example.com/c-other",
        );

        let events = view.apply_remote(stranger);
        assert!(events.is_empty());
        assert_eq!(view.contract().unwrap().id, ContractId::new("c-1"));
    }

    #[test]
    fn idle_view_needs_no_polling() {
        let view = SaleView::new();
        assert!(!view.polling_required());
        assert_eq!(view.delivery_state(), DeliveryState::Pending);
        assert!(view.lead_id().is_none());
    }
}
