//! Detached ed25519 signatures over encoded metadata sections

use crate::{keys::SigningKeyPair, CryptoError, Result, VerifyingKey};
use ed25519_dalek::Signer;
use serde::{Deserialize, Serialize};

/// Signature scheme identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigVersion {
    /// No scheme; only valid on a blank signature
    #[default]
    Nil,
    /// Ed25519 over the raw message bytes
    Ed25519,
}

/// A detached signature plus the key that produced it
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Signature scheme
    pub version: SigVersion,
    /// Raw signature bytes
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
    /// Key claimed to have produced the signature
    pub verifying_key: VerifyingKey,
}

impl SignatureInfo {
    /// True for a signature that was never filled in
    pub fn is_nil(&self) -> bool {
        self.signature.is_empty() || self.version == SigVersion::Nil
    }
}

impl SigningKeyPair {
    /// Sign a message, producing a detached signature
    pub fn sign(&self, msg: &[u8]) -> SignatureInfo {
        let signature = self.signing_key().sign(msg);
        SignatureInfo {
            version: SigVersion::Ed25519,
            signature: signature.to_bytes().to_vec(),
            verifying_key: self.verifying_key(),
        }
    }
}

/// Verify a detached signature over `msg`.
///
/// Malformed keys or signatures are reported as a verification failure,
/// never as a distinct error.
pub fn verify(msg: &[u8], sig: &SignatureInfo) -> Result<()> {
    if sig.is_nil() {
        return Err(CryptoError::BlankSignature);
    }
    match sig.version {
        SigVersion::Ed25519 => {}
        SigVersion::Nil => return Err(CryptoError::SignatureVerification),
    }

    let key = sig
        .verifying_key
        .to_dalek()
        .map_err(|_| CryptoError::SignatureVerification)?;
    let signature = ed25519_dalek::Signature::from_slice(&sig.signature)
        .map_err(|_| CryptoError::SignatureVerification)?;

    key.verify_strict(msg, &signature)
        .map_err(|_| CryptoError::SignatureVerification)
}
