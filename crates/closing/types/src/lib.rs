//! Domain types for the Shutterdesk sale completion workflow
//!
//! Completing a sale turns a selected package for a lead into a signed,
//! paid, delivered contract. Two records carry that journey:
//!
//! - **ContractDraft**: everything the operator has entered so far, saved
//!   locally per lead so an interrupted session can resume. Drafts expire
//!   after a TTL and remember which step they were on.
//! - **Contract**: the authoritative record owned by the remote contract
//!   service. Once it exists, local state only mirrors it; remote wins on
//!   every refresh.
//!
//! # Key Concepts
//!
//! - **WorkflowStep**: Edit, Review, Send. The step is part of the draft,
//!   so resume lands exactly where the operator left off.
//! - **Completion gate**: a contract may complete only when payment has
//!   cleared and a signature exists (remote or captured in session).
//! - **DeliveryEmail**: tri-state delivery outcome. `sent` is `None` until
//!   the remote side resolves the send, then `Some(true)`/`Some(false)`.
//! - **SaleEvent**: broadcast notifications host surfaces subscribe to,
//!   covering the hooks fired when a contract goes out and when it
//!   completes.
//!
//! # Design Principles
//!
//! 1. Contract transitions only move forward. Abandoning a sale discards
//!    the draft; it never rewinds the contract.
//! 2. The remote record is authoritative. Local code never "fixes" remote
//!    state, it only observes and reports inconsistencies.
//! 3. Every error is classified: validation, remote, incomplete response,
//!    or gate refusal. Handling policy follows the class, not the message.

#![deny(unsafe_code)]

mod contract;
mod draft;
mod errors;
mod event;
mod ids;

pub use contract::*;
pub use draft::*;
pub use errors::*;
pub use event::*;
pub use ids::*;
