//! # rootmd MD Server
//!
//! Wire model and remote-store contract for signed root metadata.
//!
//! This crate provides:
//! - **Wire records**: [`SignedRootMetadata`] and the identifiers it carries
//! - **Codec**: deterministic DAG-CBOR encoding used for signatures and hashes
//! - **MdServer trait**: the four calls the metadata layer makes to the remote store
//! - **MemoryMdServer**: an in-memory server for tests and local simulation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Metadata Operations            │
//! ├─────────────────────────────────────────┤
//! │            MdServer Trait               │
//! ├────────────────────┬────────────────────┤
//! │   remote server    │   MemoryMdServer   │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! The server is not trusted. It may return records for the wrong folder,
//! drop revisions, or hand back forged bytes; callers verify everything.

pub mod codec;
pub mod error;
pub mod memory;
pub mod record;

pub use codec::{Codec, DagCborCodec};
pub use error::{CodecError, Result, StoreError};
pub use memory::MemoryMdServer;
pub use record::{
    BareFolderHandle, BareRootMetadata, Branch, BranchId, FolderId, MdId, MetadataFlags,
    Revision, SignedRootMetadata, UserId, WriterMetadata,
};

use async_trait::async_trait;

/// Trait for remote metadata server backends
#[async_trait]
pub trait MdServer: Send + Sync {
    /// Look up a folder by handle and return its latest record on `branch`.
    ///
    /// The folder id is always returned; the record is `None` when the folder
    /// has no metadata yet.
    async fn get_for_handle(
        &self,
        handle: &BareFolderHandle,
        branch: &Branch,
    ) -> Result<(FolderId, Option<SignedRootMetadata>)>;

    /// Latest record of a folder on `branch`, `None` if there is none
    async fn get_for_folder(
        &self,
        id: &FolderId,
        branch: &Branch,
    ) -> Result<Option<SignedRootMetadata>>;

    /// Records with revisions in `start..=stop`, newest first.
    ///
    /// A `start` of [`Revision::UNINITIALIZED`] means "from the first revision".
    async fn get_range(
        &self,
        id: &FolderId,
        branch: &Branch,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<SignedRootMetadata>>;

    /// Append a record to `branch`
    async fn put(&self, record: &SignedRootMetadata, branch: &Branch) -> Result<()>;
}
