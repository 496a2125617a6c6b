//! In-memory reference implementation of the draft store.
//!
//! Deterministic and test-friendly. The desktop client uses the file
//! backend; this one backs tests and short-lived sessions.

use crate::traits::{DraftStore, DEFAULT_DRAFT_TTL_HOURS};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Duration;
use closing_types::{ContractDraft, LeadId};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory draft store with lazy TTL expiry.
pub struct MemoryDraftStore {
    drafts: RwLock<HashMap<LeadId, ContractDraft>>,
    ttl: Duration,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self {
            drafts: RwLock::new(HashMap::new()),
            ttl: Duration::hours(DEFAULT_DRAFT_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Number of stored drafts, expired ones included.
    pub fn len(&self) -> usize {
        self.drafts.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save(&self, draft: &ContractDraft) -> StoreResult<()> {
        let mut guard = self
            .drafts
            .write()
            .map_err(|_| StoreError::Backend("drafts lock poisoned".to_string()))?;
        guard.insert(draft.lead_id.clone(), draft.clone());
        Ok(())
    }

    async fn load(&self, lead_id: &LeadId) -> StoreResult<Option<ContractDraft>> {
        let mut guard = self
            .drafts
            .write()
            .map_err(|_| StoreError::Backend("drafts lock poisoned".to_string()))?;

        match guard.get(lead_id) {
            Some(draft) if draft.is_expired(self.ttl) => {
                tracing::debug!(lead_id = %lead_id, "Purging expired draft on load");
                guard.remove(lead_id);
                Ok(None)
            }
            Some(draft) => Ok(Some(draft.clone())),
            None => Ok(None),
        }
    }

    async fn discard(&self, lead_id: &LeadId) -> StoreResult<()> {
        let mut guard = self
            .drafts
            .write()
            .map_err(|_| StoreError::Backend("drafts lock poisoned".to_string()))?;
        guard.remove(lead_id);
        Ok(())
    }

    async fn sweep(&self) -> StoreResult<usize> {
        let mut guard = self
            .drafts
            .write()
            .map_err(|_| StoreError::Backend("drafts lock poisoned".to_string()))?;
        let before = guard.len();
        let ttl = self.ttl;
        guard.retain(|_, draft| !draft.is_expired(ttl));
        Ok(before - guard.len())
    }
}
