//! Wire records exchanged with the metadata server
//!
//! Nothing in here is trusted: a [`SignedRootMetadata`] is only an envelope
//! until its signatures have been checked by the caller.

use crate::{codec::Codec, error::CodecError};
use rand::RngCore;
use rootmd_crypto::{hashing::hash, Blake3Hash, SignatureInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a folder identifier in bytes
pub const FOLDER_ID_SIZE: usize = 16;

/// Size of a branch identifier in bytes
pub const BRANCH_ID_SIZE: usize = 16;

const PRIVATE_FOLDER_SUFFIX: u8 = 0x16;
const PUBLIC_FOLDER_SUFFIX: u8 = 0x17;

/// Identifier of a shared folder.
///
/// The last byte records whether the folder is public.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(#[serde(with = "serde_bytes")] [u8; FOLDER_ID_SIZE]);

impl FolderId {
    /// Generate a random folder id
    pub fn random(public: bool) -> Self {
        let mut bytes = [0u8; FOLDER_ID_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        bytes[FOLDER_ID_SIZE - 1] = if public {
            PUBLIC_FOLDER_SUFFIX
        } else {
            PRIVATE_FOLDER_SUFFIX
        };
        Self(bytes)
    }

    /// Create from raw bytes, checking the visibility suffix
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: [u8; FOLDER_ID_SIZE] = bytes.try_into().map_err(|_| {
            CodecError::Invalid(format!(
                "folder id must be {} bytes, got {}",
                FOLDER_ID_SIZE,
                bytes.len()
            ))
        })?;
        match arr[FOLDER_ID_SIZE - 1] {
            PRIVATE_FOLDER_SUFFIX | PUBLIC_FOLDER_SUFFIX => Ok(Self(arr)),
            other => Err(CodecError::Invalid(format!(
                "unknown folder id suffix {other:#04x}"
            ))),
        }
    }

    /// Get the id bytes
    pub fn as_bytes(&self) -> &[u8; FOLDER_ID_SIZE] {
        &self.0
    }

    /// True for a public folder
    pub fn is_public(&self) -> bool {
        self.0[FOLDER_ID_SIZE - 1] == PUBLIC_FOLDER_SUFFIX
    }

    /// Convert to a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FolderId({})", self.to_hex())
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Identifier of an unmerged (conflict) branch
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchId(#[serde(with = "serde_bytes")] [u8; BRANCH_ID_SIZE]);

impl BranchId {
    /// Generate a random branch id
    pub fn random() -> Self {
        let mut bytes = [0u8; BRANCH_ID_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; BRANCH_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Convert to a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchId({})", self.to_hex())
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Which history line a request addresses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Branch {
    /// The canonical history line
    #[default]
    Merged,
    /// A conflict branch
    Unmerged(BranchId),
}

impl Branch {
    /// Branch id as recorded in the writer section (none for merged)
    pub fn branch_id(&self) -> Option<BranchId> {
        match self {
            Self::Merged => None,
            Self::Unmerged(bid) => Some(*bid),
        }
    }

    /// Inverse of [`Branch::branch_id`]
    pub fn from_branch_id(bid: Option<BranchId>) -> Self {
        bid.map_or(Self::Merged, Self::Unmerged)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged => write!(f, "merged"),
            Self::Unmerged(bid) => write!(f, "unmerged:{bid}"),
        }
    }
}

/// Monotonic revision number of a folder's metadata
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    /// Placeholder for "no revision"; as a range start it means "from the beginning"
    pub const UNINITIALIZED: Revision = Revision(0);
    /// First revision of every folder
    pub const INITIAL: Revision = Revision(1);

    /// The following revision, or `None` at `u64::MAX`
    pub fn next(self) -> Option<Revision> {
        self.0.checked_add(1).map(Revision)
    }

    /// Raw revision number
    pub fn number(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of an encoded [`BareRootMetadata`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MdId(Blake3Hash);

impl MdId {
    /// The null id, used as the previous root of revision 1
    pub const NULL: MdId = MdId(Blake3Hash::ZERO);

    /// Hash already-encoded metadata bytes
    pub fn from_encoded(bytes: &[u8]) -> Self {
        Self(hash(bytes))
    }

    /// Wrap a raw hash
    pub fn from_hash(hash: Blake3Hash) -> Self {
        Self(hash)
    }

    /// True for the null id
    pub fn is_null(&self) -> bool {
        self.0.is_zero()
    }

    /// Get the underlying hash
    pub fn hash(&self) -> &Blake3Hash {
        &self.0
    }
}

impl fmt::Debug for MdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MdId({})", self.0.to_hex())
    }
}

impl fmt::Display for MdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Identity of a user
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Wire form of a folder handle: its participant sets.
///
/// [`BareFolderHandle::new`] sorts and deduplicates, and drops readers that are
/// already writers, so equal participant sets encode identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BareFolderHandle {
    /// Users allowed to write
    pub writers: Vec<UserId>,
    /// Users allowed to read only
    pub readers: Vec<UserId>,
    /// Readable by everyone
    pub public: bool,
}

impl BareFolderHandle {
    /// Build a canonical bare handle
    pub fn new(
        writers: impl IntoIterator<Item = UserId>,
        readers: impl IntoIterator<Item = UserId>,
        public: bool,
    ) -> Self {
        let mut writers: Vec<UserId> = writers.into_iter().collect();
        writers.sort();
        writers.dedup();

        let mut readers: Vec<UserId> = readers
            .into_iter()
            .filter(|r| writers.binary_search(r).is_err())
            .collect();
        readers.sort();
        readers.dedup();

        Self {
            writers,
            readers,
            public,
        }
    }

    /// Re-apply canonical ordering to a handle of unknown provenance
    pub fn canonicalize(&self) -> Self {
        Self::new(self.writers.clone(), self.readers.clone(), self.public)
    }
}

/// Bit flags carried in the signed body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataFlags {
    /// The writer section was copied verbatim from the previous revision
    /// (e.g. a rekey by a non-writer) and keeps its original signature
    pub writer_metadata_copied: bool,
    /// This revision only changed keys
    pub rekey: bool,
}

/// The subset of metadata authored and signed by the last writer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterMetadata {
    /// Folder this record belongs to
    pub id: FolderId,
    /// Conflict branch, none on the merged line
    pub branch_id: Option<BranchId>,
    /// Folder writers
    pub writers: Vec<UserId>,
    /// Author of the writer section
    pub last_modifying_writer: UserId,
    /// Encoded private payload; encrypted for private folders
    #[serde(with = "serde_bytes")]
    pub serialized_private_metadata: Vec<u8>,
    /// Revision whose folder key sealed the payload. A copied writer section
    /// keeps the generation it was written with.
    pub key_generation: Revision,
    /// Bytes used by the folder's blocks
    pub disk_usage: u64,
}

/// The full metadata body covered by the overall signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BareRootMetadata {
    /// Writer-authored section
    pub writer_metadata: WriterMetadata,
    /// Detached signature over the encoded writer section
    pub writer_signature: SignatureInfo,
    /// Revision number
    pub revision: Revision,
    /// Content hash of the previous revision
    pub prev_root: MdId,
    /// Read-only members
    pub readers: Vec<UserId>,
    /// Author of the whole record (may differ from the last writer)
    pub last_modifying_user: UserId,
    /// Flags
    pub flags: MetadataFlags,
}

impl BareRootMetadata {
    /// Folder this record belongs to
    pub fn id(&self) -> FolderId {
        self.writer_metadata.id
    }

    /// Canonical bare handle described by this record
    pub fn bare_handle(&self) -> BareFolderHandle {
        BareFolderHandle::new(
            self.writer_metadata.writers.clone(),
            self.readers.clone(),
            self.writer_metadata.id.is_public(),
        )
    }

    /// Branch recorded in the writer section
    pub fn branch(&self) -> Branch {
        Branch::from_branch_id(self.writer_metadata.branch_id)
    }

    /// Content hash over the encoded body
    pub fn md_id<C: Codec>(&self, codec: &C) -> Result<MdId, CodecError> {
        let bytes = codec.encode(self)?;
        Ok(MdId::from_encoded(&bytes))
    }
}

/// A root metadata record as stored on, and returned by, the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRootMetadata {
    /// The signed body
    pub md: BareRootMetadata,
    /// Detached signature over the encoded body
    pub sig_info: SignatureInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DagCborCodec;
    use proptest::prelude::*;

    fn sample_body(id: FolderId) -> BareRootMetadata {
        BareRootMetadata {
            writer_metadata: WriterMetadata {
                id,
                branch_id: None,
                writers: vec!["alice".into(), "bob".into()],
                last_modifying_writer: "alice".into(),
                serialized_private_metadata: vec![1, 2, 3],
                key_generation: Revision::INITIAL,
                disk_usage: 0,
            },
            writer_signature: SignatureInfo::default(),
            revision: Revision::INITIAL,
            prev_root: MdId::NULL,
            readers: vec![],
            last_modifying_user: "alice".into(),
            flags: MetadataFlags::default(),
        }
    }

    #[test]
    fn test_folder_id_visibility() {
        assert!(FolderId::random(true).is_public());
        assert!(!FolderId::random(false).is_public());
    }

    #[test]
    fn test_folder_id_rejects_unknown_suffix() {
        let mut bytes = *FolderId::random(false).as_bytes();
        bytes[FOLDER_ID_SIZE - 1] = 0;
        assert!(FolderId::from_bytes(&bytes).is_err());
        assert!(FolderId::from_bytes(&[0x16; 3]).is_err());
    }

    #[test]
    fn test_branch_id_roundtrip() {
        let bid = BranchId::random();
        assert_eq!(Branch::from_branch_id(Some(bid)), Branch::Unmerged(bid));
        assert_eq!(Branch::from_branch_id(None), Branch::Merged);
        assert_eq!(Branch::Unmerged(bid).branch_id(), Some(bid));
    }

    #[test]
    fn test_bare_handle_drops_writers_from_readers() {
        let h = BareFolderHandle::new(
            vec!["bob".into(), "alice".into()],
            vec!["alice".into(), "carol".into()],
            false,
        );
        assert_eq!(h.writers, vec![UserId::from("alice"), UserId::from("bob")]);
        assert_eq!(h.readers, vec![UserId::from("carol")]);
    }

    #[test]
    fn test_revision_next_stops_at_max() {
        assert_eq!(Revision(4).next(), Some(Revision(5)));
        assert_eq!(Revision(u64::MAX).next(), None);
    }

    #[test]
    fn test_md_id_changes_with_body() {
        let codec = DagCborCodec;
        let body = sample_body(FolderId::random(false));
        let mut other = body.clone();
        other.writer_metadata.disk_usage = 1;

        assert_eq!(body.md_id(&codec).unwrap(), body.md_id(&codec).unwrap());
        assert_ne!(body.md_id(&codec).unwrap(), other.md_id(&codec).unwrap());
    }

    #[test]
    fn test_signed_record_decodes_to_same_value() {
        let codec = DagCborCodec;
        let record = SignedRootMetadata {
            md: sample_body(FolderId::random(true)),
            sig_info: SignatureInfo::default(),
        };
        let bytes = codec.encode(&record).unwrap();
        let decoded: SignedRootMetadata = codec.decode(&bytes).unwrap();
        assert_eq!(record, decoded);
    }

    proptest! {
        #[test]
        fn prop_bare_handle_is_order_independent(
            mut names in proptest::collection::vec("[a-e]{1,3}", 1..6),
            public in any::<bool>(),
        ) {
            let forward = BareFolderHandle::new(
                names.iter().map(|n| UserId::new(n.as_str())),
                Vec::new(),
                public,
            );
            names.reverse();
            let reversed = BareFolderHandle::new(
                names.iter().map(|n| UserId::new(n.as_str())),
                Vec::new(),
                public,
            );
            let codec = DagCborCodec;
            prop_assert_eq!(codec.encode(&forward).unwrap(), codec.encode(&reversed).unwrap());
        }
    }
}
