//! Workflow events broadcast to host surfaces
//!
//! The orchestrator publishes these on a broadcast channel. The two
//! notification hooks the host cares most about are `ContractSent` and
//! `Completed`; the rest narrate observed remote transitions so screens
//! can re-render without polling the orchestrator.

use crate::{Contract, ContractId, LeadId, PaymentStatus, SignatureStatus, WorkflowStep};
use serde::{Deserialize, Serialize};

/// Where an operator lands when leaving the workflow early
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitTarget {
    /// Back to package selection
    Packages,
    /// Back to the photo gallery
    Photos,
}

/// Events emitted while a sale moves toward completion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SaleEvent {
    /// A stored draft was resumed at the step it was saved on
    DraftResumed {
        lead_id: LeadId,
        step: WorkflowStep,
    },

    /// The stored draft was discarded in favor of a fresh one
    DraftDiscarded {
        lead_id: LeadId,
    },

    /// The remote contract now exists
    ContractCreated {
        contract: Contract,
    },

    /// The signing link went out to the customer
    ContractSent {
        contract: Contract,
        to: String,
    },

    /// The poller observed a signature status change
    SignatureObserved {
        contract_id: ContractId,
        status: SignatureStatus,
    },

    /// The poller observed a payment status change
    PaymentObserved {
        contract_id: ContractId,
        status: PaymentStatus,
    },

    /// The delivery email resolved to delivered or failed
    DeliveryResolved {
        contract_id: ContractId,
        delivered: bool,
    },

    /// The sale completed; terminal
    Completed {
        contract: Contract,
    },

    /// The operator left the workflow for another screen
    NavigatedBack {
        target: ExitTarget,
    },
}
