//! Error types for the rootmd-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid ciphertext format
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The signature has no bytes and can never validate
    #[error("signature is blank")]
    BlankSignature,

    /// Signature verification failed
    #[error("signature verification failed")]
    SignatureVerification,

    /// Signing is not possible with the configured keys
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid nonce
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    /// Unknown envelope or signature version
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
