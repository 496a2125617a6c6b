//! Sale completion engine for the Shutterdesk studio CRM
//!
//! Drives one sale at a time from draft to completed contract: editing
//! and persisting the draft, creating the authoritative contract, sending
//! the signing link, watching remote status, and finalizing once the
//! completion gate clears.
//!
//! # Key Principle
//!
//! **The remote contract service owns the truth.** The engine mirrors it,
//! never patches it. Local state is a draft before creation and a cached
//! snapshot after; every poll applies the whole remote record atomically.
//!
//! # Architecture
//!
//! The [`SaleOrchestrator`] composes specialized components:
//!
//! - [`CompletionGate`] - the pure predicate deciding when completion is allowed
//! - [`LifecycleController`] - guarded forward-only contract transitions
//! - [`StatusPoller`] - fixed-cadence remote refresh while signing and delivery settle
//! - [`DeliveryDispatcher`] - delivery email interpretation and manual resend
//! - [`SaleView`] - the shared state both the poller and operator actions mutate
//!
//! Collaborators (lead directory, package catalog, invoice book, signature
//! pad) are trait seams in [`providers`]; the draft store and contract
//! service come from their own crates.

#![deny(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod gate;
pub mod lifecycle;
pub mod orchestrator;
pub mod poller;
pub mod providers;
pub mod view;

// Re-export main types
pub use config::{CompletionConfig, PollerConfig};
pub use delivery::DeliveryDispatcher;
pub use gate::{CompletionBlocker, CompletionGate};
pub use lifecycle::LifecycleController;
pub use orchestrator::{OpenOutcome, SaleOrchestrator};
pub use poller::{PollerHandle, StatusPoller, TickOutcome};
pub use providers::{
    DraftSources, FixedSignaturePad, InvoiceBook, LeadDirectory, PackageCatalog, SignaturePad,
    StaticDirectory,
};
pub use view::{SalePhase, SaleView};
