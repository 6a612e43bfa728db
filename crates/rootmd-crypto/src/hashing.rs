//! Hashing utilities using BLAKE3
//!
//! Content hashes link each metadata revision to its predecessor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a BLAKE3 hash output in bytes (256 bits)
pub const HASH_BYTE_SIZE: usize = 32;

/// Type alias for hash output bytes
pub type HashOutput = [u8; HASH_BYTE_SIZE];

/// A BLAKE3 hash wrapper with convenience methods
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Blake3Hash(#[serde(with = "serde_bytes")] HashOutput);

impl Blake3Hash {
    /// The all-zero hash
    pub const ZERO: Blake3Hash = Blake3Hash([0u8; HASH_BYTE_SIZE]);

    /// Create a new hash from bytes
    pub fn new(bytes: HashOutput) -> Self {
        Self(bytes)
    }

    /// Get the hash as bytes
    pub fn as_bytes(&self) -> &HashOutput {
        &self.0
    }

    /// Convert to a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check if this hash is all zeros
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl Default for Blake3Hash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake3Hash({})", self.to_hex())
    }
}

impl fmt::Display for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Blake3Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<HashOutput> for Blake3Hash {
    fn from(bytes: HashOutput) -> Self {
        Self(bytes)
    }
}

impl From<blake3::Hash> for Blake3Hash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Hash the given data using BLAKE3
pub fn hash(data: &[u8]) -> Blake3Hash {
    blake3::hash(data).into()
}
