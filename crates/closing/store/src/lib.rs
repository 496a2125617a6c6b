//! Draft persistence for the sale completion workflow.
//!
//! One draft per lead, written through on every edit, expiring after a
//! TTL so a stale draft never greets an operator weeks later. Expiry is
//! lazy: `load` purges and reports absence, nothing runs in the
//! background.
//!
//! Backends:
//! - in-memory, for tests and short-lived sessions
//! - JSON files under a root directory, one file per lead, for the
//!   desktop client's local cache
//!
//! Concurrent writers are resolved last-write-wins at save granularity.

#![deny(unsafe_code)]

mod error;
mod file;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileDraftStore;
pub use memory::MemoryDraftStore;
pub use traits::{DraftStore, DEFAULT_DRAFT_TTL_HOURS};
