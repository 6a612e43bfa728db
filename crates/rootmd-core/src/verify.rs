//! Turning a signed wire record into trusted metadata
//!
//! Order of checks for every record:
//! 1. both signatures are present
//! 2. both signing keys belong to the claimed users at the record's revision
//! 3. the last writer is a folder writer and the last user can read the folder
//! 4. the writer signature covers the encoded writer section
//! 5. the overall signature covers the encoded body
//! 6. the payload decodes, after decryption for private folders
//!
//! An unconfirmed key stops at step 2, so a record signed with an unknown key
//! is reported as unverifiable rather than as a bad signature.

use crate::{
    config::MdOpsConfig,
    crypto::Crypto,
    error::SignedSection,
    keys::KeyResolver,
    metadata::{PrivateMetadata, RootMetadata},
    trust::KeyTrust,
    FolderHandle, MdOpsError, Result,
};
use rootmd_crypto::{CryptoError, EncryptedPrivateMetadata, VerifyingKey};
use rootmd_mdserver::{Codec, FolderId, Revision, SignedRootMetadata, UserId};
use tracing::{debug, instrument, warn};

/// Verifies signed records against the session's collaborators
pub struct ChainVerifier<'a, C> {
    codec: &'a C,
    crypto: &'a dyn Crypto,
    trust: &'a dyn KeyTrust,
    keys: &'a dyn KeyResolver,
    config: &'a MdOpsConfig,
}

impl<'a, C: Codec> ChainVerifier<'a, C> {
    /// Create a verifier
    pub fn new(
        codec: &'a C,
        crypto: &'a dyn Crypto,
        trust: &'a dyn KeyTrust,
        keys: &'a dyn KeyResolver,
        config: &'a MdOpsConfig,
    ) -> Self {
        Self {
            codec,
            crypto,
            trust,
            keys,
            config,
        }
    }

    /// Verify one record and decode its payload
    #[instrument(skip(self, record), fields(folder = %record.md.id(), revision = %record.md.revision))]
    pub async fn verify(&self, record: &SignedRootMetadata) -> Result<RootMetadata> {
        let md = &record.md;
        let folder = md.id();
        let revision = md.revision;

        if md.writer_signature.is_nil() {
            return Err(blank(SignedSection::Writer, revision));
        }
        if record.sig_info.is_nil() {
            return Err(blank(SignedSection::Body, revision));
        }

        let writer = &md.writer_metadata.last_modifying_writer;
        self.check_key(folder, revision, writer, &md.writer_signature.verifying_key)
            .await?;
        self.check_key(folder, revision, &md.last_modifying_user, &record.sig_info.verifying_key)
            .await?;

        let handle = FolderHandle::from_bare(&md.bare_handle());
        if self.config.check_membership {
            if !handle.is_writer(writer) {
                return Err(MdOpsError::NotAWriter {
                    folder,
                    user: writer.clone(),
                });
            }
            if !handle.is_reader(&md.last_modifying_user) {
                return Err(MdOpsError::NotAReader {
                    folder,
                    user: md.last_modifying_user.clone(),
                });
            }
        }

        let writer_bytes = self.codec.encode(&md.writer_metadata)?;
        self.crypto
            .verify(&writer_bytes, &md.writer_signature)
            .map_err(|source| bad_signature(SignedSection::Writer, revision, source))?;

        let body_bytes = self.codec.encode(md)?;
        self.crypto
            .verify(&body_bytes, &record.sig_info)
            .map_err(|source| bad_signature(SignedSection::Body, revision, source))?;

        let data = self.decode_payload(record, &handle).await?;

        debug!("record verified");
        Ok(RootMetadata::from_parts(md.clone(), data))
    }

    async fn check_key(
        &self,
        folder: FolderId,
        revision: Revision,
        user: &UserId,
        key: &VerifyingKey,
    ) -> Result<()> {
        let answer = self
            .config
            .bounded("has_verifying_key", self.trust.has_verifying_key(user, key, revision))
            .await?;
        match answer {
            Ok(()) => Ok(()),
            Err(reason) if reason.is_unverifiable() => {
                warn!(%user, %reason, "signing key not confirmed");
                Err(MdOpsError::UnverifiableUpdate {
                    folder,
                    revision,
                    user: user.clone(),
                    reason,
                })
            }
            Err(other) => Err(MdOpsError::Trust(other)),
        }
    }

    /// Decode the payload, opening it with the key generation named in the
    /// writer section for private folders
    async fn decode_payload(
        &self,
        record: &SignedRootMetadata,
        handle: &FolderHandle,
    ) -> Result<PrivateMetadata> {
        let md = &record.md;
        let folder = md.id();
        let revision = md.revision;
        let payload = &md.writer_metadata.serialized_private_metadata;
        if folder.is_public() {
            return Ok(self.codec.decode(payload)?);
        }

        let key_generation = md.writer_metadata.key_generation;
        if key_generation > revision {
            warn!(%key_generation, "key generation ahead of revision");
            return Err(MdOpsError::KeyGeneration {
                folder,
                revision,
                key_generation,
            });
        }

        let sealed: EncryptedPrivateMetadata = self.codec.decode(payload)?;
        let key = self
            .config
            .bounded(
                "resolve_folder_key",
                self.keys.resolve_folder_key(&folder, handle, key_generation),
            )
            .await?
            .map_err(|source| MdOpsError::KeyResolution {
                folder,
                revision,
                source,
            })?;
        let encoded = self
            .crypto
            .decrypt_private_metadata(&sealed, &key, &folder)
            .map_err(|source| MdOpsError::Decryption {
                folder,
                revision,
                source,
            })?;
        Ok(self.codec.decode(&encoded)?)
    }
}

fn blank(section: SignedSection, revision: Revision) -> MdOpsError {
    warn!(%section, %revision, "blank signature");
    MdOpsError::Signature {
        section,
        revision,
        source: CryptoError::BlankSignature,
    }
}

fn bad_signature(section: SignedSection, revision: Revision, source: CryptoError) -> MdOpsError {
    warn!(%section, %revision, "signature did not verify");
    MdOpsError::Signature {
        section,
        revision,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keys::{KeyResolveError, MockKeyResolver},
        test_support::Fixture,
        trust::{KeyTrustError, MockKeyTrust},
        ErrorKind,
    };
    use rootmd_crypto::{SignatureInfo, SigningKeyPair};
    use rootmd_mdserver::MdId;
    use rstest::rstest;

    #[rstest]
    #[case::public(true)]
    #[case::private(false)]
    #[tokio::test]
    async fn test_valid_record_verifies(#[case] public: bool) {
        let fx = Fixture::new(public);
        let record = fx.record(Revision(1), MdId::NULL);

        let md = fx.verifier().verify(&record).await.unwrap();

        assert_eq!(md.id(), fx.id);
        assert_eq!(md.revision(), Revision(1));
        assert_eq!(md.data(), &fx.data(1));
    }

    #[rstest]
    #[case::writer(SignedSection::Writer)]
    #[case::body(SignedSection::Body)]
    #[tokio::test]
    async fn test_blank_signature_rejected(#[case] section: SignedSection) {
        let fx = Fixture::new(false);
        let mut record = fx.record(Revision(1), MdId::NULL);
        match section {
            SignedSection::Writer => record.md.writer_signature = SignatureInfo::default(),
            SignedSection::Body => record.sig_info = SignatureInfo::default(),
        }

        // no collaborator is consulted for a blank signature
        let trust = MockKeyTrust::new();
        let keys = MockKeyResolver::new();
        let config = MdOpsConfig::default();
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &trust, &keys, &config);

        let err = verifier.verify(&record).await.unwrap_err();
        assert!(matches!(
            err,
            MdOpsError::Signature { section: s, source: CryptoError::BlankSignature, .. } if s == section
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_key_is_unverifiable_not_bad_signature() {
        let fx = Fixture::new(false);
        let record = fx.record(Revision(1), MdId::NULL);

        let mut trust = MockKeyTrust::new();
        trust.expect_has_verifying_key().returning(|user, _, _| {
            Err(KeyTrustError::KeyNotFound { user: user.clone() })
        });
        let keys = MockKeyResolver::new();
        let config = MdOpsConfig::default();
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &trust, &keys, &config);

        let err = verifier.verify(&record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnverifiableUpdate);
    }

    #[tokio::test]
    async fn test_trust_service_failure_is_transport() {
        let fx = Fixture::new(true);
        let record = fx.record(Revision(1), MdId::NULL);

        let mut trust = MockKeyTrust::new();
        trust
            .expect_has_verifying_key()
            .returning(|_, _, _| Err(KeyTrustError::Unavailable("503".into())));
        let keys = MockKeyResolver::new();
        let config = MdOpsConfig::default();
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &trust, &keys, &config);

        let err = verifier.verify(&record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_corrupted_body_signature_rejected() {
        let fx = Fixture::new(true);
        let mut record = fx.record(Revision(1), MdId::NULL);
        record.sig_info.signature[0] ^= 0x01;

        let err = fx.verifier().verify(&record).await.unwrap_err();
        assert!(matches!(
            err,
            MdOpsError::Signature { section: SignedSection::Body, source: CryptoError::SignatureVerification, .. }
        ));
    }

    #[tokio::test]
    async fn test_tampered_writer_section_rejected() {
        let fx = Fixture::new(true);
        let mut record = fx.record(Revision(1), MdId::NULL);
        record.md.writer_metadata.disk_usage += 1;

        let err = fx.verifier().verify(&record).await.unwrap_err();
        assert!(matches!(
            err,
            MdOpsError::Signature { section: SignedSection::Writer, .. }
        ));
    }

    #[tokio::test]
    async fn test_signer_outside_folder_rejected() {
        let fx = Fixture::new(false);
        let mut record = fx.record(Revision(1), MdId::NULL);
        record.md.last_modifying_user = UserId::from("mallory");
        let record = fx.sign_body_as(record, &fx.mallory);

        let err = fx.verifier().verify(&record).await.unwrap_err();
        assert!(matches!(err, MdOpsError::NotAReader { .. }));
        assert_eq!(err.kind(), ErrorKind::IdentityMismatch);
    }

    #[tokio::test]
    async fn test_membership_check_can_be_disabled() {
        let fx = Fixture::new(false);
        let mut record = fx.record(Revision(1), MdId::NULL);
        record.md.last_modifying_user = UserId::from("mallory");
        let record = fx.sign_body_as(record, &fx.mallory);

        let config = MdOpsConfig {
            check_membership: false,
            ..Default::default()
        };
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &fx.trust, &fx.keys, &config);
        assert!(verifier.verify(&record).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_folder_key_is_decryption_error() {
        let fx = Fixture::new(false);
        let record = fx.record(Revision(1), MdId::NULL);

        let mut keys = MockKeyResolver::new();
        keys.expect_resolve_folder_key()
            .returning(|id, _, revision| Err(KeyResolveError::NotFound { folder: *id, revision }));
        let config = MdOpsConfig::default();
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &fx.trust, &keys, &config);

        let err = verifier.verify(&record).await.unwrap_err();
        assert!(matches!(err, MdOpsError::KeyResolution { .. }));
        assert_eq!(err.kind(), ErrorKind::Decryption);
    }

    #[tokio::test]
    async fn test_payload_opened_with_recorded_key_generation() {
        let fx = Fixture::new(false);
        let record = fx.record(Revision(1), MdId::NULL);
        let mut bare = record.md.clone();
        bare.revision = Revision(4);
        let record = fx.sign(bare);

        let mut keys = MockKeyResolver::new();
        let folder_key = fx.folder_key.clone();
        keys.expect_resolve_folder_key()
            .withf(|_, _, revision| *revision == Revision(1))
            .times(1)
            .returning(move |_, _, _| Ok(folder_key.clone()));
        let config = MdOpsConfig::default();
        let verifier = ChainVerifier::new(&fx.codec, &fx.crypto, &fx.trust, &keys, &config);

        let md = verifier.verify(&record).await.unwrap();
        assert_eq!(md.data(), &fx.data(1));
        assert_eq!(md.key_generation(), Revision(1));
    }

    #[tokio::test]
    async fn test_future_key_generation_rejected() {
        let fx = Fixture::new(false);
        let mut bare = fx.body(Revision(1), MdId::NULL);
        bare.writer_metadata.key_generation = Revision(2);
        let record = fx.sign(bare);

        let err = fx.verifier().verify(&record).await.unwrap_err();
        assert!(matches!(
            err,
            MdOpsError::KeyGeneration { key_generation: Revision(2), .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Decryption);
    }

    #[tokio::test]
    async fn test_record_signed_by_untrusted_device_rejected() {
        let fx = Fixture::new(true);
        let mut record = fx.record(Revision(1), MdId::NULL);
        let stranger = SigningKeyPair::generate();
        let body = fx.codec.encode(&record.md).unwrap();
        record.sig_info = stranger.sign(&body);

        let err = fx.verifier().verify(&record).await.unwrap_err();
        assert!(err.is_unverifiable());
    }
}
