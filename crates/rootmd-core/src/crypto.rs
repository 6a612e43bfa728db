//! Signing, verification and payload encryption used by metadata operations

use rootmd_crypto::{
    verify, AeadCipher, CryptoError, EncryptedPrivateMetadata, FolderKey, Result, SignatureInfo,
    SigningKeyPair, VerifyingKey,
};
use rootmd_mdserver::FolderId;

/// Cryptographic operations on encoded metadata.
///
/// Encryption binds the ciphertext to the folder id, so a payload cannot be
/// replayed into another folder.
pub trait Crypto: Send + Sync {
    /// Sign encoded bytes with the session's device key
    fn sign(&self, msg: &[u8]) -> Result<SignatureInfo>;

    /// Check a detached signature over encoded bytes
    fn verify(&self, msg: &[u8], sig: &SignatureInfo) -> Result<()>;

    /// Seal an encoded private payload
    fn encrypt_private_metadata(
        &self,
        encoded: &[u8],
        key: &FolderKey,
        folder: &FolderId,
    ) -> Result<EncryptedPrivateMetadata>;

    /// Open a sealed private payload, returning the encoded bytes
    fn decrypt_private_metadata(
        &self,
        sealed: &EncryptedPrivateMetadata,
        key: &FolderKey,
        folder: &FolderId,
    ) -> Result<Vec<u8>>;
}

/// [`Crypto`] using a local ed25519 device key.
///
/// New payloads are sealed with the configured cipher. Opening follows the
/// cipher recorded in the envelope.
#[derive(Clone, Debug)]
pub struct LocalCrypto {
    signer: Option<SigningKeyPair>,
    cipher: AeadCipher,
}

impl LocalCrypto {
    /// Crypto that signs with `signer`
    pub fn new(signer: SigningKeyPair) -> Self {
        Self {
            signer: Some(signer),
            cipher: AeadCipher::default(),
        }
    }

    /// Crypto that can verify and decrypt but not sign
    pub fn verify_only() -> Self {
        Self {
            signer: None,
            cipher: AeadCipher::default(),
        }
    }

    /// Seal new payloads with `cipher`
    pub fn with_cipher(mut self, cipher: AeadCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Public half of the device key, if there is one
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        self.signer.as_ref().map(SigningKeyPair::verifying_key)
    }
}

impl Crypto for LocalCrypto {
    fn sign(&self, msg: &[u8]) -> Result<SignatureInfo> {
        self.signer
            .as_ref()
            .map(|signer| signer.sign(msg))
            .ok_or_else(|| CryptoError::Signing("no device signing key".into()))
    }

    fn verify(&self, msg: &[u8], sig: &SignatureInfo) -> Result<()> {
        verify(msg, sig)
    }

    fn encrypt_private_metadata(
        &self,
        encoded: &[u8],
        key: &FolderKey,
        folder: &FolderId,
    ) -> Result<EncryptedPrivateMetadata> {
        EncryptedPrivateMetadata::seal_with(encoded, key, folder.as_bytes(), self.cipher)
    }

    fn decrypt_private_metadata(
        &self,
        sealed: &EncryptedPrivateMetadata,
        key: &FolderKey,
        folder: &FolderId,
    ) -> Result<Vec<u8>> {
        sealed.open(key, folder.as_bytes())
    }
}
