//! Metadata operations
//!
//! [`MdOps`] is the only way metadata enters or leaves the client. Every
//! record fetched from the server is verified and checked against the request
//! before it is returned; every record submitted is encoded, encrypted where
//! needed, and signed here.

use crate::{
    chain::validate_chain,
    config::MdOpsConfig,
    crypto::Crypto,
    keys::KeyResolver,
    metadata::RootMetadata,
    reconcile::{reconcile_branch, reconcile_folder_id, reconcile_handle},
    trust::KeyTrust,
    verify::ChainVerifier,
    FolderHandle, MdOpsError, Result,
};
use futures::future::try_join_all;
use rootmd_crypto::CryptoError;
use rootmd_mdserver::{
    Branch, BranchId, Codec, DagCborCodec, FolderId, MdId, MdServer, Revision,
    SignedRootMetadata, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of a successful submit
#[derive(Clone, Debug)]
pub struct Submitted {
    /// The record exactly as sent to the server
    pub signed: SignedRootMetadata,
    /// The submitted metadata as the server now holds it, hash already known
    pub md: RootMetadata,
}

/// Verified fetch and signed submit of root metadata
pub struct MdOps<C: Codec = DagCborCodec> {
    server: Arc<dyn MdServer>,
    crypto: Arc<dyn Crypto>,
    trust: Arc<dyn KeyTrust>,
    keys: Arc<dyn KeyResolver>,
    session: UserId,
    codec: C,
    config: MdOpsConfig,
}

impl MdOps<DagCborCodec> {
    /// Create metadata operations for the session user
    pub fn new(
        server: Arc<dyn MdServer>,
        crypto: Arc<dyn Crypto>,
        trust: Arc<dyn KeyTrust>,
        keys: Arc<dyn KeyResolver>,
        session: UserId,
    ) -> Self {
        Self {
            server,
            crypto,
            trust,
            keys,
            session,
            codec: DagCborCodec,
            config: MdOpsConfig::default(),
        }
    }
}

impl<C: Codec> MdOps<C> {
    /// Replace the configuration
    pub fn with_config(mut self, config: MdOpsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the codec
    pub fn with_codec<D: Codec>(self, codec: D) -> MdOps<D> {
        MdOps {
            server: self.server,
            crypto: self.crypto,
            trust: self.trust,
            keys: self.keys,
            session: self.session,
            codec,
            config: self.config,
        }
    }

    /// The codec used for signatures and hashes
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Current configuration
    pub fn config(&self) -> &MdOpsConfig {
        &self.config
    }

    /// The session user
    pub fn session(&self) -> &UserId {
        &self.session
    }

    /// Verifier bound to this session's collaborators
    pub fn verifier(&self) -> ChainVerifier<'_, C> {
        ChainVerifier::new(
            &self.codec,
            self.crypto.as_ref(),
            self.trust.as_ref(),
            self.keys.as_ref(),
            &self.config,
        )
    }

    /// Latest merged metadata of the folder named by `handle`.
    ///
    /// Returns the folder id even when the folder has no metadata yet. When a
    /// record exists, the id is the one in the verified record.
    #[instrument(skip(self, handle), fields(handle = %handle))]
    pub async fn get_for_handle(
        &self,
        handle: &FolderHandle,
    ) -> Result<(FolderId, Option<RootMetadata>)> {
        let (id, record) = self
            .config
            .bounded("get_for_handle", self.server.get_for_handle(handle.bare(), &Branch::Merged))
            .await??;

        let Some(record) = record else {
            debug!(folder = %id, "folder has no metadata yet");
            return Ok((id, None));
        };

        let md = self.verifier().verify(&record).await?;
        reconcile_handle(handle, md.handle())?;
        reconcile_branch(&Branch::Merged, &md.branch())?;

        if md.id() != id {
            warn!(server = %id, record = %md.id(), "server folder id differs from record");
        }
        Ok((md.id(), Some(md)))
    }

    /// Latest merged metadata of a folder
    #[instrument(skip(self))]
    pub async fn get_for_folder(&self, id: &FolderId) -> Result<Option<RootMetadata>> {
        self.get_latest(id, Branch::Merged).await
    }

    /// Latest metadata of a folder on an unmerged branch
    #[instrument(skip(self))]
    pub async fn get_unmerged_for_folder(
        &self,
        id: &FolderId,
        branch_id: BranchId,
    ) -> Result<Option<RootMetadata>> {
        self.get_latest(id, Branch::Unmerged(branch_id)).await
    }

    /// Merged revisions `start..=stop`, newest first.
    ///
    /// A `start` of [`Revision::UNINITIALIZED`] means "from the first revision".
    #[instrument(skip(self))]
    pub async fn get_range(
        &self,
        id: &FolderId,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<RootMetadata>> {
        self.get_range_on(id, Branch::Merged, start, stop).await
    }

    /// Unmerged revisions `start..=stop`, newest first
    #[instrument(skip(self))]
    pub async fn get_unmerged_range(
        &self,
        id: &FolderId,
        branch_id: BranchId,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<RootMetadata>> {
        self.get_range_on(id, Branch::Unmerged(branch_id), start, stop).await
    }

    /// Sign and store the next merged revision
    #[instrument(skip(self, md), fields(folder = %md.id(), revision = %md.revision()))]
    pub async fn put(&self, md: &RootMetadata) -> Result<Submitted> {
        self.submit(md, Branch::Merged).await
    }

    /// Sign and store the next revision of an unmerged branch
    #[instrument(skip(self, md), fields(folder = %md.id(), revision = %md.revision()))]
    pub async fn put_unmerged(&self, md: &RootMetadata, branch_id: BranchId) -> Result<Submitted> {
        self.submit(md, Branch::Unmerged(branch_id)).await
    }

    async fn get_latest(&self, id: &FolderId, branch: Branch) -> Result<Option<RootMetadata>> {
        let record = self
            .config
            .bounded("get_for_folder", self.server.get_for_folder(id, &branch))
            .await??;

        let Some(record) = record else {
            debug!(folder = %id, %branch, "no metadata on branch");
            return Ok(None);
        };

        let md = self.verifier().verify(&record).await?;
        reconcile_folder_id(id, &md.id())?;
        reconcile_branch(&branch, &md.branch())?;
        Ok(Some(md))
    }

    async fn get_range_on(
        &self,
        id: &FolderId,
        branch: Branch,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<RootMetadata>> {
        let first = start.max(Revision::INITIAL);
        if stop < first {
            return Err(MdOpsError::InvalidRange {
                start,
                stop,
                reason: "stop precedes start".into(),
            });
        }
        if stop.number() - first.number() >= self.config.max_range_len {
            return Err(MdOpsError::InvalidRange {
                start,
                stop,
                reason: format!("longer than {} revisions", self.config.max_range_len),
            });
        }

        let records = self
            .config
            .bounded("get_range", self.server.get_range(id, &branch, start, stop))
            .await??;

        let verifier = self.verifier();
        let mds = try_join_all(records.iter().map(|record| verifier.verify(record))).await?;

        validate_chain(&mds, &self.codec)?;
        for md in &mds {
            reconcile_folder_id(id, &md.id())?;
            reconcile_branch(&branch, &md.branch())?;
            if md.revision() < first || md.revision() > stop {
                return Err(MdOpsError::UnexpectedRevision {
                    revision: md.revision(),
                    start: first,
                    stop,
                });
            }
        }

        debug!(folder = %id, %branch, count = mds.len(), "range verified");
        Ok(mds)
    }

    async fn submit(&self, md: &RootMetadata, branch: Branch) -> Result<Submitted> {
        let folder = md.id();
        let mut bare = md.bare().clone();
        bare.last_modifying_user = self.session.clone();

        if md.writer_metadata_copied() {
            if bare.writer_signature.is_nil() {
                return Err(MdOpsError::Signing(CryptoError::BlankSignature));
            }
            reconcile_branch(&branch, &bare.branch())?;
        } else {
            if self.config.check_membership && !md.handle().is_writer(&self.session) {
                return Err(MdOpsError::NotAWriter {
                    folder,
                    user: self.session.clone(),
                });
            }

            let wm = &mut bare.writer_metadata;
            wm.last_modifying_writer = self.session.clone();
            wm.branch_id = branch.branch_id();
            wm.key_generation = md.revision();

            let encoded = self.codec.encode(md.data())?;
            wm.serialized_private_metadata = if folder.is_public() {
                encoded
            } else {
                let key = self
                    .config
                    .bounded(
                        "resolve_folder_key",
                        self.keys.resolve_folder_key(&folder, md.handle(), md.revision()),
                    )
                    .await?
                    .map_err(|source| MdOpsError::KeyResolution {
                        folder,
                        revision: md.revision(),
                        source,
                    })?;
                let sealed = self
                    .crypto
                    .encrypt_private_metadata(&encoded, &key, &folder)
                    .map_err(MdOpsError::Encryption)?;
                self.codec.encode(&sealed)?
            };

            let writer_bytes = self.codec.encode(&bare.writer_metadata)?;
            bare.writer_signature = self.crypto.sign(&writer_bytes).map_err(MdOpsError::Signing)?;
        }

        let body = self.codec.encode(&bare)?;
        let sig_info = self.crypto.sign(&body).map_err(MdOpsError::Signing)?;
        let signed = SignedRootMetadata { md: bare, sig_info };

        self.config
            .bounded("put", self.server.put(&signed, &branch))
            .await??;

        info!(%folder, %branch, revision = %signed.md.revision, "metadata submitted");
        let md = RootMetadata::with_known_id(signed.md.clone(), md.data().clone(), MdId::from_encoded(&body));
        Ok(Submitted { signed, md })
    }
}
