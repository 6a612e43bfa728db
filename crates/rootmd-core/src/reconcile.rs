//! Checks that fetched metadata is for what was asked

use crate::{FolderHandle, MdOpsError, Result};
use rootmd_mdserver::{Branch, FolderId};
use tracing::warn;

/// The record's participants must equal the requested handle
pub fn reconcile_handle(requested: &FolderHandle, fetched: &FolderHandle) -> Result<()> {
    if requested.bare() != fetched.bare() {
        warn!(%requested, %fetched, "handle mismatch");
        return Err(MdOpsError::HandleMismatch {
            requested: requested.to_string(),
            actual: fetched.to_string(),
        });
    }
    Ok(())
}

/// The record must name the requested folder
pub fn reconcile_folder_id(requested: &FolderId, fetched: &FolderId) -> Result<()> {
    if requested != fetched {
        warn!(%requested, %fetched, "folder id mismatch");
        return Err(MdOpsError::FolderIdMismatch {
            requested: *requested,
            actual: *fetched,
        });
    }
    Ok(())
}

/// The record must be on the requested branch
pub fn reconcile_branch(requested: &Branch, fetched: &Branch) -> Result<()> {
    if requested != fetched {
        warn!(%requested, %fetched, "branch mismatch");
        return Err(MdOpsError::BranchMismatch {
            requested: *requested,
            actual: *fetched,
        });
    }
    Ok(())
}
