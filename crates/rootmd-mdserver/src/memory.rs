//! In-memory metadata server for testing and local simulation

use crate::{
    codec::{Codec, DagCborCodec},
    record::{BareFolderHandle, Branch, FolderId, MdId, Revision, SignedRootMetadata},
    MdServer, Result, StoreError,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// An in-memory metadata server.
///
/// Enforces the same append rules as a real server: each put must extend the
/// branch head by exactly one revision and point at the head's content hash.
/// The first put on an unmerged branch extends the merged head.
#[derive(Clone, Default)]
pub struct MemoryMdServer {
    handles: Arc<DashMap<BareFolderHandle, FolderId>>,
    histories: Arc<DashMap<(FolderId, Branch), Vec<SignedRootMetadata>>>,
    codec: DagCborCodec,
}

impl MemoryMdServer {
    /// Create a new empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revisions stored for a folder branch
    pub fn len(&self, id: &FolderId, branch: &Branch) -> usize {
        self.histories
            .get(&(*id, *branch))
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Check if a folder branch has no revisions
    pub fn is_empty(&self, id: &FolderId, branch: &Branch) -> bool {
        self.len(id, branch) == 0
    }

    /// Latest record of a folder branch
    pub fn head(&self, id: &FolderId, branch: &Branch) -> Option<SignedRootMetadata> {
        self.histories
            .get(&(*id, *branch))
            .and_then(|entry| entry.value().last().cloned())
    }

    /// Store a record without any append checks.
    ///
    /// Lets tests model a buggy or malicious server.
    pub fn insert_unchecked(&self, record: SignedRootMetadata, branch: Branch) {
        let id = record.md.id();
        self.handles
            .entry(record.md.bare_handle())
            .or_insert(id);
        self.histories.entry((id, branch)).or_default().push(record);
    }

    /// Point a handle at an arbitrary folder id
    pub fn alias_handle(&self, handle: &BareFolderHandle, id: FolderId) {
        self.handles.insert(handle.canonicalize(), id);
    }

    fn head_link(&self, id: &FolderId, branch: &Branch) -> Result<(Revision, MdId)> {
        match self.head(id, branch) {
            Some(head) => Ok((head.md.revision, head.md.md_id(&self.codec)?)),
            None => Ok((Revision::UNINITIALIZED, MdId::NULL)),
        }
    }
}

#[async_trait]
impl MdServer for MemoryMdServer {
    async fn get_for_handle(
        &self,
        handle: &BareFolderHandle,
        branch: &Branch,
    ) -> Result<(FolderId, Option<SignedRootMetadata>)> {
        let id = *self
            .handles
            .entry(handle.canonicalize())
            .or_insert_with(|| FolderId::random(handle.public))
            .value();
        Ok((id, self.head(&id, branch)))
    }

    async fn get_for_folder(
        &self,
        id: &FolderId,
        branch: &Branch,
    ) -> Result<Option<SignedRootMetadata>> {
        Ok(self.head(id, branch))
    }

    async fn get_range(
        &self,
        id: &FolderId,
        branch: &Branch,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<SignedRootMetadata>> {
        let start = start.max(Revision::INITIAL);
        if stop < start {
            return Err(StoreError::InvalidRange { start, stop });
        }

        let mut records: Vec<SignedRootMetadata> = self
            .histories
            .get(&(*id, *branch))
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|r| r.md.revision >= start && r.md.revision <= stop)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.reverse();
        Ok(records)
    }

    async fn put(&self, record: &SignedRootMetadata, branch: &Branch) -> Result<()> {
        let id = record.md.id();
        if record.md.branch() != *branch {
            return Err(StoreError::BranchMismatch {
                record: record.md.branch().to_string(),
                addressed: branch.to_string(),
            });
        }

        // An unmerged branch forks from the merged head.
        let (head_rev, head_id) = if self.is_empty(&id, branch) {
            match branch {
                Branch::Merged => (Revision::UNINITIALIZED, MdId::NULL),
                Branch::Unmerged(_) => self.head_link(&id, &Branch::Merged)?,
            }
        } else {
            self.head_link(&id, branch)?
        };

        if head_rev.next() != Some(record.md.revision) {
            return Err(StoreError::Conflict {
                current: head_rev,
                attempted: record.md.revision,
            });
        }
        if record.md.prev_root != head_id {
            return Err(StoreError::ConflictPrevRoot {
                expected: head_id,
                actual: record.md.prev_root,
            });
        }

        let mut history = self.histories.entry((id, *branch)).or_default();
        // Re-check under the entry lock; a concurrent put may have landed.
        let landed = history.last().map(|r| r.md.revision);
        if landed.is_some_and(|rev| rev >= record.md.revision) {
            return Err(StoreError::Conflict {
                current: landed.unwrap_or(head_rev),
                attempted: record.md.revision,
            });
        }
        history.push(record.clone());
        drop(history);

        if *branch == Branch::Merged && record.md.revision == Revision::INITIAL {
            self.handles.entry(record.md.bare_handle()).or_insert(id);
        }

        debug!(folder = %id, %branch, revision = %record.md.revision, "stored metadata");
        Ok(())
    }
}
