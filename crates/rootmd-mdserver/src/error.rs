//! Error types for the rootmd-mdserver crate

use crate::record::{FolderId, MdId, Revision};
use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a metadata server
#[derive(Error, Debug)]
pub enum StoreError {
    /// Folder not known to the server
    #[error("folder not found: {0}")]
    FolderNotFound(FolderId),

    /// The put does not extend the current head
    #[error("revision conflict: head is {current}, attempted {attempted}")]
    Conflict { current: Revision, attempted: Revision },

    /// The put's previous root does not match the current head
    #[error("prev root conflict: expected {expected}, got {actual}")]
    ConflictPrevRoot { expected: MdId, actual: MdId },

    /// The record's signed branch does not match the addressed branch
    #[error("branch mismatch: record signed for {record}, addressed to {addressed}")]
    BranchMismatch { record: String, addressed: String },

    /// Requested range is malformed
    #[error("invalid range: {start}..={stop}")]
    InvalidRange { start: Revision, stop: Revision },

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Encoding error while handling a record
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors from the deterministic record codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be encoded
    #[error("encode error: {0}")]
    Encode(String),

    /// Bytes could not be decoded into the requested type
    #[error("decode error: {0}")]
    Decode(String),

    /// A decoded value is structurally invalid
    #[error("invalid value: {0}")]
    Invalid(String),
}
