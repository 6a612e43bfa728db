//! Folder key resolution for private payloads

use crate::handle::FolderHandle;
use async_trait::async_trait;
use dashmap::DashMap;
use rootmd_crypto::FolderKey;
use rootmd_mdserver::{FolderId, Revision};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Why a folder key could not be produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyResolveError {
    /// No key generation covers the revision
    #[error("no key for folder {folder} at revision {revision}")]
    NotFound { folder: FolderId, revision: Revision },

    /// The key service could not be reached
    #[error("key service unavailable: {0}")]
    Unavailable(String),
}

/// Produces the symmetric key that encrypts a private folder's payload
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Key in effect for `revision` of the folder
    async fn resolve_folder_key(
        &self,
        id: &FolderId,
        handle: &FolderHandle,
        revision: Revision,
    ) -> Result<FolderKey, KeyResolveError>;
}

/// Key resolver backed by a fixed table of key generations.
///
/// Each generation applies from its first revision until the next one starts.
#[derive(Clone, Default)]
pub struct StaticKeyResolver {
    generations: Arc<DashMap<FolderId, Vec<(Revision, FolderKey)>>>,
}

impl StaticKeyResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key generation starting at `first_revision`
    pub fn add_key(&self, id: FolderId, first_revision: Revision, key: FolderKey) {
        let mut generations = self.generations.entry(id).or_default();
        generations.retain(|(start, _)| *start != first_revision);
        generations.push((first_revision, key));
        generations.sort_by_key(|(start, _)| *start);
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve_folder_key(
        &self,
        id: &FolderId,
        _handle: &FolderHandle,
        revision: Revision,
    ) -> Result<FolderKey, KeyResolveError> {
        let not_found = || KeyResolveError::NotFound {
            folder: *id,
            revision,
        };
        let generations = self.generations.get(id).ok_or_else(not_found)?;
        let key = generations
            .iter()
            .rev()
            .find(|(start, _)| *start <= revision)
            .map(|(_, key)| key.clone())
            .ok_or_else(not_found)?;
        debug!(folder = %id, %revision, "resolved folder key");
        Ok(key)
    }
}
