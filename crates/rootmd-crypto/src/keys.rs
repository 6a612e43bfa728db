//! Key types for root metadata
//!
//! - [`FolderKey`]: symmetric key that encrypts a private folder's metadata payload
//! - [`SigningKeyPair`]: a device's ed25519 signing key
//! - [`VerifyingKey`]: the wire form of an ed25519 public key, as carried in signatures

use crate::{CryptoError, Result};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of a nonce in bytes (96 bits for AES-GCM/ChaCha20-Poly1305)
pub const NONCE_SIZE: usize = 12;

/// Size of an ed25519 verifying key in bytes
pub const VERIFYING_KEY_SIZE: usize = 32;

/// A symmetric folder key for encrypting private metadata
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FolderKey {
    key: [u8; KEY_SIZE],
}

impl FolderKey {
    /// Generate a new random folder key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut key);
        Self { key }
    }

    /// Create a folder key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "folder key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for FolderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// An ed25519 public key as it appears on the wire.
///
/// Kept as raw bytes so that a malformed key from the server decodes fine and
/// simply fails verification later.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VerifyingKey {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl VerifyingKey {
    /// Create from raw bytes without validation
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if no key bytes are present
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse into a dalek verifying key
    pub fn to_dalek(&self) -> Result<ed25519_dalek::VerifyingKey> {
        let arr: [u8; VERIFYING_KEY_SIZE] = self.bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "verifying key must be {} bytes, got {}",
                VERIFYING_KEY_SIZE,
                self.bytes.len()
            ))
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
        Ok(Self::from_bytes(&bytes))
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_base64())
    }
}

impl From<ed25519_dalek::VerifyingKey> for VerifyingKey {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self::from_bytes(key.as_bytes())
    }
}

/// An ed25519 signing key pair for a device
#[derive(Clone)]
pub struct SigningKeyPair {
    signing: ed25519_dalek::SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Create from a 32-byte secret seed
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = seed.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "signing seed must be {} bytes, got {}",
                KEY_SIZE,
                seed.len()
            ))
        })?;
        Ok(Self {
            signing: ed25519_dalek::SigningKey::from_bytes(&arr),
        })
    }

    /// Get the public half in wire form
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key().into()
    }

    pub(crate) fn signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.signing
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("verifying_key", &self.verifying_key())
            .finish()
    }
}
