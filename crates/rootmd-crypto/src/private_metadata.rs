//! Encrypted private metadata envelope
//!
//! A private folder's metadata payload is encoded by the caller, then sealed
//! here with the folder key. The envelope is what ends up inside the signed
//! record, so the server only ever sees ciphertext.

use crate::{
    keys::FolderKey,
    symmetric::{Aead, AeadCipher, Nonce},
    CryptoError, Result, CRYPTO_VERSION,
};
use serde::{Deserialize, Serialize};

/// Encrypted private metadata bundle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPrivateMetadata {
    /// Version of the encryption format
    pub version: u8,
    /// Cipher used to seal the payload
    pub cipher: AeadCipher,
    /// Nonce used for encryption
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
    /// Encrypted payload (encoded metadata, then AEAD encrypted)
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedPrivateMetadata {
    /// Seal an encoded payload with the default cipher
    pub fn seal(plaintext: &[u8], key: &FolderKey, aad: &[u8]) -> Result<Self> {
        Self::seal_with(plaintext, key, aad, AeadCipher::default())
    }

    /// Seal an encoded payload with a specific cipher
    pub fn seal_with(plaintext: &[u8], key: &FolderKey, aad: &[u8], cipher: AeadCipher) -> Result<Self> {
        let nonce = Nonce::generate();
        let ciphertext = Aead::new(key, cipher).encrypt_with_aad(&nonce, plaintext, aad)?;

        Ok(Self {
            version: CRYPTO_VERSION,
            cipher,
            nonce: nonce.as_bytes().to_vec(),
            ciphertext,
        })
    }

    /// Open the envelope, returning the encoded payload
    pub fn open(&self, key: &FolderKey, aad: &[u8]) -> Result<Vec<u8>> {
        if self.version != CRYPTO_VERSION {
            return Err(CryptoError::UnsupportedVersion(self.version));
        }
        if self.ciphertext.len() < self.cipher.tag_size() {
            return Err(CryptoError::InvalidCiphertext(format!(
                "ciphertext is {} bytes, shorter than the tag",
                self.ciphertext.len()
            )));
        }
        let nonce = Nonce::from_bytes(&self.nonce)?;
        Aead::new(key, self.cipher).decrypt_with_aad(&nonce, &self.ciphertext, aad)
    }
}
