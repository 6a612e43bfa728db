//! Shared fixtures for unit tests

use crate::{
    config::MdOpsConfig,
    crypto::LocalCrypto,
    keys::StaticKeyResolver,
    metadata::{DirEntry, PrivateMetadata},
    trust::LocalKeyTrust,
    verify::ChainVerifier,
    FolderHandle, MdOps,
};
use async_trait::async_trait;
use mockall::mock;
use rootmd_crypto::{EncryptedPrivateMetadata, FolderKey, SignatureInfo, SigningKeyPair};
use rootmd_mdserver::{
    BareFolderHandle, BareRootMetadata, Branch, Codec, DagCborCodec, FolderId, MdId, MdServer,
    MetadataFlags, Result, Revision, SignedRootMetadata, UserId, WriterMetadata,
};
use std::sync::Arc;

mock! {
    pub Server {}

    #[async_trait]
    impl MdServer for Server {
        async fn get_for_handle(
            &self,
            handle: &BareFolderHandle,
            branch: &Branch,
        ) -> Result<(FolderId, Option<SignedRootMetadata>)>;

        async fn get_for_folder(
            &self,
            id: &FolderId,
            branch: &Branch,
        ) -> Result<Option<SignedRootMetadata>>;

        async fn get_range(
            &self,
            id: &FolderId,
            branch: &Branch,
            start: Revision,
            stop: Revision,
        ) -> Result<Vec<SignedRootMetadata>>;

        async fn put(&self, record: &SignedRootMetadata, branch: &Branch) -> Result<()>;
    }
}

/// A folder `alice,bob#carol` written by alice, with mallory as a known
/// outsider
pub(crate) struct Fixture {
    pub codec: DagCborCodec,
    pub alice: SigningKeyPair,
    pub mallory: SigningKeyPair,
    pub crypto: LocalCrypto,
    pub trust: LocalKeyTrust,
    pub keys: StaticKeyResolver,
    pub config: MdOpsConfig,
    pub folder_key: FolderKey,
    pub handle: FolderHandle,
    pub id: FolderId,
}

impl Fixture {
    pub fn new(public: bool) -> Self {
        let alice = SigningKeyPair::generate();
        let mallory = SigningKeyPair::generate();
        let trust = LocalKeyTrust::new();
        trust.add_key(UserId::from("alice"), alice.verifying_key());
        trust.add_key(UserId::from("mallory"), mallory.verifying_key());

        let id = FolderId::random(public);
        let folder_key = FolderKey::generate();
        let keys = StaticKeyResolver::new();
        keys.add_key(id, Revision::INITIAL, folder_key.clone());

        Self {
            codec: DagCborCodec,
            crypto: LocalCrypto::new(alice.clone()),
            alice,
            mallory,
            trust,
            keys,
            config: MdOpsConfig::default(),
            folder_key,
            handle: FolderHandle::parse("alice,bob#carol", public).unwrap(),
            id,
        }
    }

    pub fn data(&self, n: u64) -> PrivateMetadata {
        PrivateMetadata {
            root_dir: DirEntry {
                block_id: format!("block-{n}"),
                encoded_size: 64 + n,
                size: 100 * n,
                ..Default::default()
            },
            changes: vec![format!("revision {n}")],
        }
    }

    /// Unsigned body of `revision` as alice would write it
    pub fn body(&self, revision: Revision, prev_root: MdId) -> BareRootMetadata {
        let encoded = self.codec.encode(&self.data(revision.number())).unwrap();
        let payload = if self.id.is_public() {
            encoded
        } else {
            let sealed = EncryptedPrivateMetadata::seal(&encoded, &self.folder_key, self.id.as_bytes())
                .unwrap();
            self.codec.encode(&sealed).unwrap()
        };

        BareRootMetadata {
            writer_metadata: WriterMetadata {
                id: self.id,
                branch_id: None,
                writers: self.handle.writers().to_vec(),
                last_modifying_writer: UserId::from("alice"),
                serialized_private_metadata: payload,
                key_generation: revision,
                disk_usage: 0,
            },
            writer_signature: SignatureInfo::default(),
            revision,
            prev_root,
            readers: self.handle.readers().to_vec(),
            last_modifying_user: UserId::from("alice"),
            flags: MetadataFlags::default(),
        }
    }

    /// Sign both sections as alice
    pub fn sign(&self, mut bare: BareRootMetadata) -> SignedRootMetadata {
        let writer_bytes = self.codec.encode(&bare.writer_metadata).unwrap();
        bare.writer_signature = self.alice.sign(&writer_bytes);
        let body = self.codec.encode(&bare).unwrap();
        SignedRootMetadata {
            sig_info: self.alice.sign(&body),
            md: bare,
        }
    }

    pub fn record(&self, revision: Revision, prev_root: MdId) -> SignedRootMetadata {
        self.sign(self.body(revision, prev_root))
    }

    /// Replace the overall signature
    pub fn sign_body_as(&self, mut record: SignedRootMetadata, signer: &SigningKeyPair) -> SignedRootMetadata {
        let body = self.codec.encode(&record.md).unwrap();
        record.sig_info = signer.sign(&body);
        record
    }

    /// Revisions 1..=n, oldest first
    pub fn chain(&self, n: u64) -> Vec<SignedRootMetadata> {
        let mut out: Vec<SignedRootMetadata> = Vec::new();
        let mut prev = MdId::NULL;
        for rev in 1..=n {
            let record = self.record(Revision(rev), prev);
            prev = record.md.md_id(&self.codec).unwrap();
            out.push(record);
        }
        out
    }

    pub fn verifier(&self) -> ChainVerifier<'_, DagCborCodec> {
        ChainVerifier::new(&self.codec, &self.crypto, &self.trust, &self.keys, &self.config)
    }

    /// Operations for alice against `server`
    pub fn ops(&self, server: Arc<dyn MdServer>) -> MdOps {
        MdOps::new(
            server,
            Arc::new(self.crypto.clone()),
            Arc::new(self.trust.clone()),
            Arc::new(self.keys.clone()),
            UserId::from("alice"),
        )
    }
}
