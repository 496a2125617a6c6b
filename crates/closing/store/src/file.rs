//! JSON-file draft store.
//!
//! One pretty-printed JSON file per lead under a root directory. This is
//! the desktop client's local cache: human-inspectable, survives restarts,
//! and tolerant of damage. A file that cannot be read or parsed counts as
//! an absent draft and is purged.

use crate::traits::{DraftStore, DEFAULT_DRAFT_TTL_HOURS};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Duration;
use closing_types::{ContractDraft, LeadId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Draft store writing one JSON file per lead.
pub struct FileDraftStore {
    root: PathBuf,
    ttl: Duration,
}

impl FileDraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: Duration::hours(DEFAULT_DRAFT_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, lead_id: &LeadId) -> PathBuf {
        // Lead ids are uuids in practice; flatten anything else so a
        // hostile id cannot point outside the root.
        let name: String = lead_id
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", name))
    }

    async fn read_draft(&self, path: &Path) -> StoreResult<Option<ContractDraft>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Purging unparsable draft file");
                let _ = tokio::fs::remove_file(path).await;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save(&self, draft: &ContractDraft) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(draft)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(&draft.lead_id), json).await?;
        Ok(())
    }

    async fn load(&self, lead_id: &LeadId) -> StoreResult<Option<ContractDraft>> {
        let path = self.path_for(lead_id);
        match self.read_draft(&path).await? {
            Some(draft) if draft.is_expired(self.ttl) => {
                tracing::debug!(lead_id = %lead_id, "Purging expired draft file on load");
                let _ = tokio::fs::remove_file(&path).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn discard(&self, lead_id: &LeadId) -> StoreResult<()> {
        match tokio::fs::remove_file(self.path_for(lead_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn sweep(&self) -> StoreResult<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(draft) = self.read_draft(&path).await? {
                if draft.is_expired(self.ttl) {
                    tokio::fs::remove_file(&path).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
