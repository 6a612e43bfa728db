//! Symmetric encryption using AES-GCM and ChaCha20-Poly1305
//!
//! Authenticated encryption of private metadata with a [`FolderKey`]. The
//! associated data binds a ciphertext to the folder it belongs to.

use crate::{
    keys::{FolderKey, KEY_SIZE, NONCE_SIZE},
    CryptoError, Result,
};
use aes_gcm::{aead::Aead as AeadTrait, Aes256Gcm, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// A nonce for AEAD encryption
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce {
    bytes: [u8; NONCE_SIZE],
}

impl Nonce {
    /// Generate a random nonce
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
        Self { bytes }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonce(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; NONCE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the nonce bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }
}

/// Supported AEAD ciphers. The cipher is recorded in each sealed envelope,
/// so payloads sealed with either one can be opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AeadCipher {
    /// AES-256-GCM
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305
    ChaCha20Poly1305,
}

impl AeadCipher {
    /// Get the authentication tag size
    pub fn tag_size(&self) -> usize {
        16
    }
}

/// AEAD encryption/decryption interface
pub struct Aead {
    cipher: AeadCipher,
    key: [u8; KEY_SIZE],
}

impl Aead {
    /// Create a new AEAD instance with the given key and cipher
    pub fn new(key: &FolderKey, cipher: AeadCipher) -> Self {
        Self {
            cipher,
            key: *key.as_bytes(),
        }
    }

    /// Create with the default cipher (AES-256-GCM)
    pub fn new_default(key: &FolderKey) -> Self {
        Self::new(key, AeadCipher::default())
    }

    /// Encrypt data with the given nonce and associated data
    pub fn encrypt_with_aad(&self, nonce: &Nonce, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        match self.cipher {
            AeadCipher::Aes256Gcm => {
                let nonce_arr = aes_gcm::Nonce::from_slice(nonce.as_bytes());
                let payload = aes_gcm::aead::Payload { msg: plaintext, aad };
                let cipher = Aes256Gcm::new_from_slice(&self.key)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
                cipher
                    .encrypt(nonce_arr, payload)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))
            }
            AeadCipher::ChaCha20Poly1305 => {
                let nonce_arr = chacha20poly1305::Nonce::from_slice(nonce.as_bytes());
                let payload = chacha20poly1305::aead::Payload { msg: plaintext, aad };
                let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
                cipher
                    .encrypt(nonce_arr, payload)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))
            }
        }
    }

    /// Decrypt data with the given nonce and associated data
    pub fn decrypt_with_aad(&self, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        match self.cipher {
            AeadCipher::Aes256Gcm => {
                let nonce_arr = aes_gcm::Nonce::from_slice(nonce.as_bytes());
                let payload = aes_gcm::aead::Payload { msg: ciphertext, aad };
                let cipher = Aes256Gcm::new_from_slice(&self.key)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))?;
                cipher
                    .decrypt(nonce_arr, payload)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))
            }
            AeadCipher::ChaCha20Poly1305 => {
                let nonce_arr = chacha20poly1305::Nonce::from_slice(nonce.as_bytes());
                let payload = chacha20poly1305::aead::Payload { msg: ciphertext, aad };
                let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))?;
                cipher
                    .decrypt(nonce_arr, payload)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))
            }
        }
    }
}

impl Drop for Aead {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AeadCipher::Aes256Gcm)]
    #[case(AeadCipher::ChaCha20Poly1305)]
    fn test_aead_roundtrip(#[case] cipher: AeadCipher) {
        let key = FolderKey::generate();
        let nonce = Nonce::generate();
        let aead = Aead::new(&key, cipher);

        let ciphertext = aead.encrypt_with_aad(&nonce, b"secret data", b"folder").unwrap();
        assert_eq!(ciphertext.len(), b"secret data".len() + cipher.tag_size());

        let decrypted = aead.decrypt_with_aad(&nonce, &ciphertext, b"folder").unwrap();
        assert_eq!(decrypted, b"secret data");
    }

    #[rstest]
    #[case(AeadCipher::Aes256Gcm)]
    #[case(AeadCipher::ChaCha20Poly1305)]
    fn test_wrong_aad_fails(#[case] cipher: AeadCipher) {
        let key = FolderKey::generate();
        let nonce = Nonce::generate();
        let aead = Aead::new(&key, cipher);

        let ciphertext = aead.encrypt_with_aad(&nonce, b"secret data", b"folder a").unwrap();
        let result = aead.decrypt_with_aad(&nonce, &ciphertext, b"folder b");

        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = Nonce::generate();
        let ciphertext = Aead::new_default(&FolderKey::generate())
            .encrypt_with_aad(&nonce, b"secret", b"")
            .unwrap();
        let result = Aead::new_default(&FolderKey::generate()).decrypt_with_aad(&nonce, &ciphertext, b"");
        assert!(result.is_err());
    }

    #[test]
    fn test_nonce_length_checked() {
        assert!(Nonce::from_bytes(&[0u8; 8]).is_err());
        assert!(Nonce::from_bytes(&[0u8; NONCE_SIZE]).is_ok());
    }
}
