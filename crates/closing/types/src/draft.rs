//! Contract drafts: locally persisted sale-in-progress state
//!
//! A draft holds everything the operator has entered for one lead. It is
//! written through on every edit and keeps being written after the remote
//! contract exists, so an interrupted session resumes at the same step
//! with the same fields. Drafts expire after a TTL enforced by the store.

use crate::{ClosingError, ClosingResult, ContractId, LeadId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ── Workflow Step ────────────────────────────────────────────────────

/// The step of the completion flow a draft was last saved at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkflowStep {
    /// Filling in contract fields
    #[default]
    Edit,
    /// Reviewing the assembled contract before creation
    Review,
    /// Contract created remotely; sending, signing, and delivery
    Send,
}

impl WorkflowStep {
    /// Check whether the step is past the point where a contract exists
    pub fn is_send(&self) -> bool {
        matches!(self, Self::Send)
    }

    /// Check whether fields are still editable at this step
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Edit | Self::Review)
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Edit => "edit",
            Self::Review => "review",
            Self::Send => "send",
        };
        write!(f, "{}", label)
    }
}

// ── Field Groups ─────────────────────────────────────────────────────

/// Customer-facing contract fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerFields {
    /// Customer display name; the minimum payload a contract needs
    pub name: String,
    /// Email the signing link and delivery go to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Studio-side contract fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioFields {
    pub name: String,
    /// The operator closing the sale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A priced line on the order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount_cents: i64,
}

/// What is being sold: the package and its line items
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFields {
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The shoot this sale belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

/// Payment terms shown on the contract
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFields {
    pub total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// All editable contract fields, grouped the way the form edits them
///
/// Each group is independently editable; an edit to one group never
/// touches the others.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftFields {
    pub customer: CustomerFields,
    pub studio: StudioFields,
    pub order: OrderFields,
    pub payment: PaymentFields,
}

// ── Contract Draft ───────────────────────────────────────────────────

/// The per-lead draft record persisted by the draft store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractDraft {
    /// The lead this draft belongs to; one draft per lead
    pub lead_id: LeadId,
    /// Everything entered so far
    pub fields: DraftFields,
    /// Where the operator left off
    pub step: WorkflowStep,
    /// Set once the remote contract exists, so a resumed session can
    /// re-attach to the authoritative record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<ContractId>,
    /// When the draft was last written; drives TTL expiry
    pub saved_at: DateTime<Utc>,
}

impl ContractDraft {
    /// Create an empty draft for a lead, starting at Edit
    pub fn new(lead_id: LeadId) -> Self {
        Self {
            lead_id,
            fields: DraftFields::default(),
            step: WorkflowStep::Edit,
            contract_id: None,
            saved_at: Utc::now(),
        }
    }

    pub fn with_fields(mut self, fields: DraftFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.step = step;
        self
    }

    /// Stamp the draft as freshly written
    pub fn touch(&mut self) {
        self.saved_at = Utc::now();
    }

    /// Link the draft to its remote contract and move it to the Send step
    pub fn attach_contract(&mut self, id: ContractId) {
        self.contract_id = Some(id);
        self.step = WorkflowStep::Send;
        self.saved_at = Utc::now();
    }

    /// Time since the draft was last written
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.saved_at)
    }

    /// Check whether the draft has outlived the given TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// Check the draft is complete enough to create a contract from
    pub fn validate(&self) -> ClosingResult<()> {
        if self.fields.customer.name.trim().is_empty() {
            return Err(ClosingError::Validation(
                "customer name is required".to_string(),
            ));
        }
        Ok(())
    }
}
