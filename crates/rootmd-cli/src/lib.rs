//! # rootmd CLI
//!
//! Runs metadata operations end to end against an in-memory server: submits a
//! series of revisions, fetches them back as a verified range, and checks that
//! a tampered record is refused.
//!
//! ```text
//! ┌──────────────┐   put / get_range   ┌──────────────────┐
//! │    MdOps     │ ──────────────────▶ │  MemoryMdServer  │
//! │ (session key)│ ◀────────────────── │   (untrusted)    │
//! └──────────────┘   signed records    └──────────────────┘
//! ```

pub mod config;

pub use config::CliConfig;

use chrono::Utc;
use rootmd_core::{
    DirEntry, FolderHandle, LocalCrypto, LocalKeyTrust, MdOps, PrivateMetadata, RootMetadata,
    StaticKeyResolver,
};
use rootmd_crypto::{FolderKey, SigningKeyPair};
use rootmd_mdserver::{Branch, MdServer, MemoryMdServer, Revision, UserId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of a simulation run
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Folder id in hex
    pub folder: String,
    /// Canonical handle
    pub handle: String,
    /// Public folder
    pub public: bool,
    /// Revisions submitted
    pub submitted: u64,
    /// Revisions returned by the verified range fetch
    pub fetched: usize,
    /// Latest revision
    pub head_revision: u64,
    /// Content hash of the latest revision in hex
    pub head_md_id: String,
    /// Error kind reported for a head record with a corrupted signature
    pub tamper_detected: Option<String>,
}

/// Submit `config.revisions` revisions and read them back
#[instrument(skip(config), fields(handle = %config.handle, revisions = config.revisions))]
pub async fn run_simulation(config: &CliConfig) -> anyhow::Result<SimulationReport> {
    let user = UserId::new(config.user.as_str());
    let handle = FolderHandle::parse(&config.handle, config.public)?;

    let device = SigningKeyPair::generate();
    let trust = LocalKeyTrust::new();
    trust.add_key(user.clone(), device.verifying_key());
    let keys = StaticKeyResolver::new();
    let server = Arc::new(MemoryMdServer::new());

    let ops = MdOps::new(
        server.clone(),
        Arc::new(LocalCrypto::new(device).with_cipher(config.cipher)),
        Arc::new(trust),
        Arc::new(keys.clone()),
        user,
    )
    .with_config(config.md_ops.clone());

    let (id, head) = ops.get_for_handle(&handle).await?;
    if head.is_some() {
        anyhow::bail!("folder {id} already has metadata");
    }
    keys.add_key(id, Revision::INITIAL, FolderKey::generate());
    info!(folder = %id, "created folder");

    let mut draft = RootMetadata::new_folder(id, &handle, payload(1))?;
    let mut last = None;
    for rev in 1..=config.revisions {
        let submitted = ops.put(&draft).await?;
        draft = submitted
            .md
            .make_successor(ops.codec())?
            .with_data(payload(rev + 1))
            .with_disk_usage(rev * 4096);
        last = Some(submitted.md);
    }
    let head = last.ok_or_else(|| anyhow::anyhow!("no revisions submitted"))?;

    let range = ops
        .get_range(&id, Revision::UNINITIALIZED, head.revision())
        .await?;
    info!(count = range.len(), "fetched verified range");

    let tamper_detected = match server.get_for_folder(&id, &Branch::Merged).await? {
        Some(mut record) => {
            if let Some(byte) = record.sig_info.signature.first_mut() {
                *byte ^= 0xff;
            }
            ops.verifier()
                .verify(&record)
                .await
                .err()
                .map(|err| format!("{:?}", err.kind()))
        }
        None => None,
    };

    Ok(SimulationReport {
        folder: id.to_hex(),
        handle: handle.to_string(),
        public: handle.is_public(),
        submitted: config.revisions,
        fetched: range.len(),
        head_revision: head.revision().number(),
        head_md_id: head.md_id(ops.codec())?.to_string(),
        tamper_detected,
    })
}

fn payload(revision: u64) -> PrivateMetadata {
    let now = Utc::now();
    PrivateMetadata {
        root_dir: DirEntry {
            block_id: format!("root-{revision}"),
            encoded_size: 512,
            size: revision * 4096,
            mtime: now,
            ctime: now,
        },
        changes: vec![format!("simulated revision {revision}")],
    }
}
