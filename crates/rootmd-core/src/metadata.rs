//! Trusted root metadata
//!
//! [`RootMetadata`] is only produced by verification, by submission, or by the
//! constructors here for drafting a new revision. Updates build a new value;
//! a verified value is never changed in place.

use crate::{handle::FolderHandle, MdOpsError, Result};
use chrono::{DateTime, Utc};
use rootmd_mdserver::{
    BareRootMetadata, Branch, Codec, CodecError, FolderId, MdId, MetadataFlags, Revision,
    UserId, WriterMetadata,
};
use rootmd_crypto::SignatureInfo;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Pointer to the folder's root directory block
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirEntry {
    /// Block holding the encoded directory
    pub block_id: String,
    /// Encoded size of the block in bytes
    pub encoded_size: u64,
    /// Logical size of the directory
    pub size: u64,
    /// Last modification time
    pub mtime: DateTime<Utc>,
    /// Last status change time
    pub ctime: DateTime<Utc>,
}

/// The payload a folder's writers keep in the metadata.
///
/// Encrypted with the folder key for private folders, stored in the clear for
/// public ones.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivateMetadata {
    /// Root directory entry
    pub root_dir: DirEntry,
    /// Short descriptions of the changes made in this revision
    pub changes: Vec<String>,
}

/// Verified (or locally drafted) root metadata of a folder
#[derive(Clone, Debug)]
pub struct RootMetadata {
    bare: BareRootMetadata,
    data: PrivateMetadata,
    md_id: OnceLock<MdId>,
    handle: OnceLock<FolderHandle>,
}

impl PartialEq for RootMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.bare == other.bare && self.data == other.data
    }
}

impl Eq for RootMetadata {}

impl RootMetadata {
    /// Draft the first revision of a folder.
    ///
    /// The signer fields are filled in on submit.
    pub fn new_folder(id: FolderId, handle: &FolderHandle, data: PrivateMetadata) -> Result<Self> {
        if id.is_public() != handle.is_public() {
            return Err(MdOpsError::InvalidHandle(format!(
                "handle {handle} visibility does not match folder {id}"
            )));
        }
        let first_writer = handle
            .writers()
            .first()
            .cloned()
            .ok_or_else(|| MdOpsError::InvalidHandle(format!("handle {handle} has no writers")))?;
        let bare = BareRootMetadata {
            writer_metadata: WriterMetadata {
                id,
                branch_id: None,
                writers: handle.writers().to_vec(),
                last_modifying_writer: first_writer.clone(),
                serialized_private_metadata: Vec::new(),
                key_generation: Revision::INITIAL,
                disk_usage: 0,
            },
            writer_signature: SignatureInfo::default(),
            revision: Revision::INITIAL,
            prev_root: MdId::NULL,
            readers: handle.readers().to_vec(),
            last_modifying_user: first_writer,
            flags: MetadataFlags::default(),
        };
        Ok(Self::from_parts(bare, data))
    }

    pub(crate) fn from_parts(bare: BareRootMetadata, data: PrivateMetadata) -> Self {
        Self {
            bare,
            data,
            md_id: OnceLock::new(),
            handle: OnceLock::new(),
        }
    }

    pub(crate) fn with_known_id(bare: BareRootMetadata, data: PrivateMetadata, md_id: MdId) -> Self {
        let md = Self::from_parts(bare, data);
        let _ = md.md_id.set(md_id);
        md
    }

    /// Draft the next revision: revision + 1 linked to this record's hash.
    ///
    /// The writer signature is kept so the draft can be submitted as a
    /// copied-writer rekey; any other submit re-signs it.
    pub fn make_successor<C: Codec>(&self, codec: &C) -> Result<Self> {
        let revision = self.bare.revision;
        let mut bare = self.bare.clone();
        bare.revision = revision.next().ok_or(MdOpsError::RevisionExhausted {
            folder: self.id(),
            revision,
        })?;
        bare.prev_root = self.md_id(codec)?;
        bare.flags = MetadataFlags::default();
        Ok(Self::from_parts(bare, self.data.clone()))
    }

    /// Replace the payload. An edited draft is an ordinary write, not a rekey.
    pub fn with_data(mut self, data: PrivateMetadata) -> Self {
        self.bare.flags = MetadataFlags::default();
        Self::from_parts(self.bare, data)
    }

    /// Set the disk usage recorded in the writer section
    pub fn with_disk_usage(mut self, disk_usage: u64) -> Self {
        self.bare.writer_metadata.disk_usage = disk_usage;
        self.bare.flags = MetadataFlags::default();
        Self::from_parts(self.bare, self.data)
    }

    /// Mark this draft as a rekey that keeps the previous writer section and
    /// its signature, so a non-writer can submit it
    pub fn into_rekey(mut self) -> Self {
        self.bare.flags.writer_metadata_copied = true;
        self.bare.flags.rekey = true;
        Self::from_parts(self.bare, self.data)
    }

    /// Content hash of the encoded body, computed once on first use.
    ///
    /// The cached value is the hash under the first codec asked. A value is
    /// expected to be hashed with one codec for its whole life, the one of the
    /// [`MdOps`](crate::MdOps) that produced it.
    pub fn md_id<C: Codec>(&self, codec: &C) -> std::result::Result<MdId, CodecError> {
        if let Some(id) = self.md_id.get() {
            return Ok(*id);
        }
        let id = self.bare.md_id(codec)?;
        Ok(*self.md_id.get_or_init(|| id))
    }

    /// Participants described by the record
    pub fn handle(&self) -> &FolderHandle {
        self.handle
            .get_or_init(|| FolderHandle::from_bare(&self.bare.bare_handle()))
    }

    /// Wire body
    pub fn bare(&self) -> &BareRootMetadata {
        &self.bare
    }

    /// Decoded payload
    pub fn data(&self) -> &PrivateMetadata {
        &self.data
    }

    /// Folder id
    pub fn id(&self) -> FolderId {
        self.bare.id()
    }

    /// Revision number
    pub fn revision(&self) -> Revision {
        self.bare.revision
    }

    /// Hash of the previous revision
    pub fn prev_root(&self) -> MdId {
        self.bare.prev_root
    }

    /// Branch recorded in the writer section
    pub fn branch(&self) -> Branch {
        self.bare.branch()
    }

    /// Author of the writer section
    pub fn last_modifying_writer(&self) -> &UserId {
        &self.bare.writer_metadata.last_modifying_writer
    }

    /// Author of the whole record
    pub fn last_modifying_user(&self) -> &UserId {
        &self.bare.last_modifying_user
    }

    /// True if this revision only changes keys
    pub fn is_rekey(&self) -> bool {
        self.bare.flags.rekey
    }

    /// Revision whose folder key sealed the payload
    pub fn key_generation(&self) -> Revision {
        self.bare.writer_metadata.key_generation
    }

    /// True if the writer section is carried over unchanged
    pub fn writer_metadata_copied(&self) -> bool {
        self.bare.flags.writer_metadata_copied
    }

    /// Bytes used by the folder
    pub fn disk_usage(&self) -> u64 {
        self.bare.writer_metadata.disk_usage
    }

    /// True for a public folder
    pub fn is_public(&self) -> bool {
        self.id().is_public()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootmd_mdserver::DagCborCodec;

    fn draft() -> RootMetadata {
        let handle = FolderHandle::parse("alice,bob#carol", false).unwrap();
        RootMetadata::new_folder(FolderId::random(false), &handle, PrivateMetadata::default()).unwrap()
    }

    #[test]
    fn test_new_folder_starts_chain() {
        let md = draft();
        assert_eq!(md.revision(), Revision::INITIAL);
        assert!(md.prev_root().is_null());
        assert_eq!(md.branch(), Branch::Merged);
        assert_eq!(md.handle().to_string(), "alice,bob#carol");
    }

    #[test]
    fn test_new_folder_rejects_visibility_mismatch() {
        let handle = FolderHandle::parse("alice", true).unwrap();
        let err = RootMetadata::new_folder(FolderId::random(false), &handle, PrivateMetadata::default())
            .unwrap_err();
        assert!(matches!(err, MdOpsError::InvalidHandle(_)));
    }

    #[test]
    fn test_successor_links_to_predecessor() {
        let codec = DagCborCodec;
        let first = draft();
        let second = first.make_successor(&codec).unwrap();

        assert_eq!(second.revision(), Revision(2));
        assert_eq!(second.prev_root(), first.md_id(&codec).unwrap());
        assert!(!second.writer_metadata_copied());
    }

    #[test]
    fn test_md_id_is_cached_and_reset_on_change() {
        let codec = DagCborCodec;
        let md = draft();
        let id = md.md_id(&codec).unwrap();
        assert_eq!(md.md_id(&codec).unwrap(), id);

        let changed = md.with_disk_usage(10);
        assert_ne!(changed.md_id(&codec).unwrap(), id);
    }

    #[test]
    fn test_rekey_then_edit_clears_copied_flag() {
        let codec = DagCborCodec;
        let rekey = draft().make_successor(&codec).unwrap().into_rekey();
        assert!(rekey.writer_metadata_copied());

        let edited = rekey.with_data(PrivateMetadata {
            changes: vec!["touch".into()],
            ..Default::default()
        });
        assert!(!edited.writer_metadata_copied());
        assert!(!edited.is_rekey());

        let resized = draft()
            .make_successor(&codec)
            .unwrap()
            .into_rekey()
            .with_disk_usage(7);
        assert!(!resized.writer_metadata_copied());
        assert!(!resized.is_rekey());
    }

    #[test]
    fn test_successor_of_last_revision_is_refused() {
        let mut bare = draft().bare().clone();
        bare.revision = Revision(u64::MAX);
        let last = RootMetadata::from_parts(bare, PrivateMetadata::default());

        let err = last.make_successor(&DagCborCodec).unwrap_err();
        assert!(matches!(err, MdOpsError::RevisionExhausted { revision: Revision(u64::MAX), .. }));
    }

    #[test]
    fn test_cached_md_id_survives_clone() {
        let codec = DagCborCodec;
        let md = draft();
        let id = md.md_id(&codec).unwrap();
        let copy = md.clone();
        assert_eq!(copy.md_id.get(), Some(&id));
    }
}
