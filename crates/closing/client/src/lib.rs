//! Client for the remote contract service.
//!
//! The contract service owns every `Contract` record. This crate defines
//! the service seam the workflow talks through, an HTTP implementation
//! for the hosted service, and an in-process authority used by tests and
//! the demo. The in-process authority enforces the same rules the hosted
//! service does: one active contract per lead, and server-side
//! re-validation of the completion gate.

#![deny(unsafe_code)]

mod error;
mod http;
mod memory;
mod service;

pub use error::{ClientError, ClientResult};
pub use http::HttpContractService;
pub use memory::MemoryContractService;
pub use service::{CompletionAttestation, ContractService, CreateContract, DeliveryReceipt};
