use crate::StoreResult;
use async_trait::async_trait;
use closing_types::{ContractDraft, LeadId};

/// Default draft lifetime. A draft older than this loads as absent.
pub const DEFAULT_DRAFT_TTL_HOURS: i64 = 24;

/// Storage interface for per-lead contract drafts.
///
/// Implementations persist drafts verbatim; callers stamp `saved_at`
/// before writing. Expiry is enforced on `load`, which purges stale
/// entries rather than returning them.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Write the draft for its lead, replacing any previous draft.
    async fn save(&self, draft: &ContractDraft) -> StoreResult<()>;

    /// Read the draft for a lead. Returns `None` when no draft exists
    /// or the stored draft has outlived the TTL (in which case it is
    /// purged first).
    async fn load(&self, lead_id: &LeadId) -> StoreResult<Option<ContractDraft>>;

    /// Delete the draft for a lead. Deleting an absent draft is not an
    /// error.
    async fn discard(&self, lead_id: &LeadId) -> StoreResult<()>;

    /// Purge every expired draft and return how many were removed.
    /// Housekeeping only; correctness never depends on it.
    async fn sweep(&self) -> StoreResult<usize>;
}
