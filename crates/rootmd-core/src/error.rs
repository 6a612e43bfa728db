//! Error types for the rootmd-core crate

use crate::{keys::KeyResolveError, trust::KeyTrustError};
use rootmd_crypto::CryptoError;
use rootmd_mdserver::{Branch, CodecError, FolderId, MdId, Revision, StoreError, UserId};
use std::fmt;
use thiserror::Error;

/// Result type alias using `MdOpsError`
pub type Result<T> = std::result::Result<T, MdOpsError>;

/// Which signature of a record failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignedSection {
    /// Signature of the last writer over the writer section
    Writer,
    /// Signature of the last modifying user over the whole body
    Body,
}

impl fmt::Display for SignedSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Writer => write!(f, "writer"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// Coarse classification of [`MdOpsError`], stable for callers to match on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server or a collaborator failed or timed out
    Transport,
    /// A signer's key could not be confirmed as valid for the signed revision
    UnverifiableUpdate,
    /// A signature was blank or did not verify
    SignatureVerification,
    /// Fetched metadata belongs to a different folder, handle, branch or membership
    IdentityMismatch,
    /// Records do not form a consecutive hash-linked chain
    CausalIntegrity,
    /// The private payload could not be opened
    Decryption,
    /// Bytes could not be encoded or decoded
    Encoding,
    /// The private payload could not be sealed on submit
    Encryption,
    /// A signature could not be produced on submit
    Signing,
    /// The request was rejected before reaching the server
    InvalidRequest,
}

/// Errors returned by metadata operations
#[derive(Error, Debug)]
pub enum MdOpsError {
    /// Error reported by the metadata server, passed through unchanged
    #[error("metadata server error: {0}")]
    Store(#[from] StoreError),

    /// A collaborator did not answer in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The key trust service failed for a reason other than an unknown key
    #[error("key trust service error: {0}")]
    Trust(KeyTrustError),

    /// A signer's key could not be confirmed for the revision it signed
    #[error("unverifiable update to folder {folder} at revision {revision} by {user}: {reason}")]
    UnverifiableUpdate {
        folder: FolderId,
        revision: Revision,
        user: UserId,
        reason: KeyTrustError,
    },

    /// A signature was blank or invalid
    #[error("{section} signature of revision {revision} is invalid: {source}")]
    Signature {
        section: SignedSection,
        revision: Revision,
        #[source]
        source: CryptoError,
    },

    /// The record names a different folder than the one requested
    #[error("folder id mismatch: requested {requested}, got {actual}")]
    FolderIdMismatch { requested: FolderId, actual: FolderId },

    /// The record describes different participants than the requested handle
    #[error("handle mismatch: requested {requested}, got {actual}")]
    HandleMismatch { requested: String, actual: String },

    /// The record belongs to a different branch than the one requested
    #[error("branch mismatch: requested {requested}, got {actual}")]
    BranchMismatch { requested: Branch, actual: Branch },

    /// The last writer is not one of the folder's writers
    #[error("{user} is not a writer of folder {folder}")]
    NotAWriter { folder: FolderId, user: UserId },

    /// The last modifying user cannot read the folder
    #[error("{user} is not a reader of folder {folder}")]
    NotAReader { folder: FolderId, user: UserId },

    /// A record's previous root is not the hash of its predecessor
    #[error("broken chain at revision {revision}: prev root {actual}, predecessor hashes to {expected}")]
    BrokenChain {
        revision: Revision,
        expected: MdId,
        actual: MdId,
    },

    /// Adjacent records are not consecutive revisions
    #[error("revision gap: {newer} does not follow {older}")]
    RevisionGap { newer: Revision, older: Revision },

    /// The server returned a revision outside the requested range
    #[error("revision {revision} outside requested range {start}..={stop}")]
    UnexpectedRevision {
        revision: Revision,
        start: Revision,
        stop: Revision,
    },

    /// No folder key could be found for a private payload
    #[error("no key for folder {folder} at revision {revision}: {source}")]
    KeyResolution {
        folder: FolderId,
        revision: Revision,
        #[source]
        source: KeyResolveError,
    },

    /// The private payload failed to decrypt
    #[error("cannot decrypt folder {folder} at revision {revision}: {source}")]
    Decryption {
        folder: FolderId,
        revision: Revision,
        #[source]
        source: CryptoError,
    },

    /// The payload claims a key generation newer than its own revision
    #[error("folder {folder} revision {revision} sealed with future key generation {key_generation}")]
    KeyGeneration {
        folder: FolderId,
        revision: Revision,
        key_generation: Revision,
    },

    /// The private payload failed to encrypt
    #[error("encryption failed: {0}")]
    Encryption(#[source] CryptoError),

    /// A signature could not be produced
    #[error("signing failed: {0}")]
    Signing(#[source] CryptoError),

    /// Encoding or decoding failed
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The handle string is malformed
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// The requested range is malformed or too long
    #[error("invalid range {start}..={stop}: {reason}")]
    InvalidRange {
        start: Revision,
        stop: Revision,
        reason: String,
    },

    /// The folder has used up its revision numbers
    #[error("folder {folder} has no revision after {revision}")]
    RevisionExhausted { folder: FolderId, revision: Revision },
}

impl MdOpsError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) | Self::Timeout { .. } | Self::Trust(_) => ErrorKind::Transport,
            Self::UnverifiableUpdate { .. } => ErrorKind::UnverifiableUpdate,
            Self::Signature { .. } => ErrorKind::SignatureVerification,
            Self::FolderIdMismatch { .. }
            | Self::HandleMismatch { .. }
            | Self::BranchMismatch { .. }
            | Self::NotAWriter { .. }
            | Self::NotAReader { .. } => ErrorKind::IdentityMismatch,
            Self::BrokenChain { .. } | Self::RevisionGap { .. } | Self::UnexpectedRevision { .. } => {
                ErrorKind::CausalIntegrity
            }
            Self::KeyResolution { .. } | Self::KeyGeneration { .. } | Self::Decryption { .. } => {
                ErrorKind::Decryption
            }
            Self::Codec(_) => ErrorKind::Encoding,
            Self::Encryption(_) => ErrorKind::Encryption,
            Self::Signing(_) => ErrorKind::Signing,
            Self::InvalidHandle(_) | Self::InvalidRange { .. } | Self::RevisionExhausted { .. } => {
                ErrorKind::InvalidRequest
            }
        }
    }

    /// True when a signer's key could not be confirmed, as opposed to a forged signature
    pub fn is_unverifiable(&self) -> bool {
        self.kind() == ErrorKind::UnverifiableUpdate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_transport() {
        let err = MdOpsError::from(StoreError::Connection("reset".into()));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_unverifiable_is_distinct_from_bad_signature() {
        let folder = FolderId::random(false);
        let unverifiable = MdOpsError::UnverifiableUpdate {
            folder,
            revision: Revision(3),
            user: UserId::from("alice"),
            reason: KeyTrustError::KeyNotFound {
                user: UserId::from("alice"),
            },
        };
        let forged = MdOpsError::Signature {
            section: SignedSection::Body,
            revision: Revision(3),
            source: CryptoError::SignatureVerification,
        };

        assert!(unverifiable.is_unverifiable());
        assert!(!forged.is_unverifiable());
        assert_eq!(forged.kind(), ErrorKind::SignatureVerification);
    }

    #[test]
    fn test_message_names_the_section() {
        let err = MdOpsError::Signature {
            section: SignedSection::Writer,
            revision: Revision(7),
            source: CryptoError::BlankSignature,
        };
        assert_eq!(
            err.to_string(),
            "writer signature of revision 7 is invalid: signature is blank"
        );
    }
}
