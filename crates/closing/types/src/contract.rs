//! Authoritative contract records mirrored from the remote service
//!
//! The remote contract service owns these records. Local code receives
//! snapshots (from create, from the status poller) and applies them whole;
//! individual fields are never patched locally.

use crate::{ContractId, LeadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Status Enums ─────────────────────────────────────────────────────

/// Overall lifecycle status of a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContractStatus {
    /// Created remotely but not yet sent to the customer
    #[default]
    Draft,
    /// Signing link delivered to the customer
    Sent,
    /// Customer has signed
    Signed,
}

/// Payment progress, recorded through a separate sub-flow and observed here
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Partial,
    Refunded,
}

/// Signature progress on the signing link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SignatureStatus {
    #[default]
    Pending,
    Sent,
    Signed,
    Declined,
}

// ── Delivery Email ───────────────────────────────────────────────────

/// Outcome of the final contract-package delivery email
///
/// `sent` is a tri-state: `None` means no resolved attempt yet (never
/// tried, or still in flight), `Some(true)` delivered, `Some(false)`
/// failed. A failed resend records its reason in `error` without touching
/// `sent`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEmail {
    pub sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub attachment_count: u32,
}

/// How a delivery email renders: derived, never stored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    /// No resolved attempt yet
    Pending,
    /// Last attempt delivered
    Sent,
    /// Last attempt failed, or an error is recorded
    Failed,
}

impl DeliveryEmail {
    /// Derive the render state from the raw fields
    pub fn state(&self) -> DeliveryState {
        match self.sent {
            Some(true) => DeliveryState::Sent,
            Some(false) => DeliveryState::Failed,
            None if self.error.is_some() => DeliveryState::Failed,
            None => DeliveryState::Pending,
        }
    }

    /// Check whether the remote side has resolved a send either way
    pub fn resolved(&self) -> bool {
        self.sent.is_some()
    }
}

// ── Contract ─────────────────────────────────────────────────────────

/// The authoritative contract record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Remote-assigned identifier
    pub id: ContractId,
    /// The lead this contract belongs to
    pub lead_id: LeadId,
    /// Where the customer signs; must be present on every create response
    pub signing_url: String,
    pub status: ContractStatus,
    pub payment_status: PaymentStatus,
    pub signature_status: SignatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_email: DeliveryEmail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(id: ContractId, lead_id: LeadId, signing_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            lead_id,
            signing_url: signing_url.into(),
            status: ContractStatus::Draft,
            payment_status: PaymentStatus::Pending,
            signature_status: SignatureStatus::Pending,
            signed_at: None,
            delivery_email: DeliveryEmail::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.status == ContractStatus::Signed
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Check the cross-field invariant: a signed contract must carry a
    /// signed signature status
    pub fn signature_consistent(&self) -> bool {
        self.status != ContractStatus::Signed
            || self.signature_status == SignatureStatus::Signed
    }

    /// Check whether the delivery email has a resolved outcome
    pub fn delivery_resolved(&self) -> bool {
        self.delivery_email.resolved()
    }
}

// ── Local Signature ──────────────────────────────────────────────────

/// A signature captured on the in-studio pad during the session
///
/// Captured synchronously while the customer is present. The workflow
/// holds it locally and submits it with the completion call, where the
/// service records it as the contract's signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignatureImage {
    /// PNG-encoded pad output
    pub png: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl SignatureImage {
    pub fn new(png: Vec<u8>) -> Self {
        Self {
            png,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}
