//! # rootmd Crypto
//!
//! Cryptographic primitives for signed, end-to-end encrypted root metadata.
//!
//! This crate provides:
//! - **Ed25519 signatures**: Detached signatures over encoded metadata sections
//! - **BLAKE3**: Content hashing for the revision chain
//! - **AEAD**: Symmetric encryption of the private metadata payload with a folder key
//!
//! ## Security Model
//!
//! The metadata server is untrusted:
//! - Every record it returns carries detached signatures that are checked client-side
//! - Private payloads are encrypted before they leave the client
//! - Folder keys never reach the server
//!
//! ## Example
//!
//! ```rust,ignore
//! use rootmd_crypto::{SigningKeyPair, verify, FolderKey, EncryptedPrivateMetadata};
//!
//! let signer = SigningKeyPair::generate();
//! let sig = signer.sign(b"encoded body");
//! verify(b"encoded body", &sig)?;
//!
//! let key = FolderKey::generate();
//! let sealed = EncryptedPrivateMetadata::seal(b"payload", &key, b"folder id")?;
//! let opened = sealed.open(&key, b"folder id")?;
//! ```

pub mod error;
pub mod hashing;
pub mod keys;
pub mod private_metadata;
pub mod signing;
pub mod symmetric;

pub use error::{CryptoError, Result};
pub use hashing::{hash, Blake3Hash, HashOutput};
pub use keys::{FolderKey, SigningKeyPair, VerifyingKey};
pub use private_metadata::EncryptedPrivateMetadata;
pub use signing::{verify, SigVersion, SignatureInfo};
pub use symmetric::{Aead, AeadCipher, Nonce};

/// The version of the private metadata encryption format
pub const CRYPTO_VERSION: u8 = 1;
