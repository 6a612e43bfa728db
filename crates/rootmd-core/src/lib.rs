//! # rootmd Core
//!
//! Metadata operations for end-to-end encrypted shared folders.
//!
//! This crate provides:
//! - **Chain verification**: signatures, signer keys and membership of every fetched record
//! - **Revision chain validation**: ranges must be consecutive and hash-linked
//! - **Reconciliation**: fetched metadata must match the requested handle, folder and branch
//! - **MdOps**: the fetch and submit façade over an untrusted metadata server
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 MdOps                   │
//! ├──────────────┬─────────────┬────────────┤
//! │ ChainVerifier│ validate_   │ reconcile_*│
//! │              │ chain       │            │
//! ├──────────────┴─────────────┴────────────┤
//! │  Crypto  │  KeyTrust  │  KeyResolver    │
//! ├─────────────────────────────────────────┤
//! │            MdServer (untrusted)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rootmd_core::{FolderHandle, MdOps, RootMetadata, PrivateMetadata};
//!
//! let handle = FolderHandle::parse("alice,bob#carol", false)?;
//! let (id, head) = ops.get_for_handle(&handle).await?;
//! let draft = match head {
//!     Some(md) => md.make_successor(ops.codec())?.with_data(data),
//!     None => RootMetadata::new_folder(id, &handle, data)?,
//! };
//! let submitted = ops.put(&draft).await?;
//! ```

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handle;
pub mod keys;
pub mod metadata;
pub mod ops;
pub mod reconcile;
pub mod trust;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use chain::validate_chain;
pub use config::MdOpsConfig;
pub use crypto::{Crypto, LocalCrypto};
pub use error::{ErrorKind, MdOpsError, Result, SignedSection};
pub use handle::FolderHandle;
pub use keys::{KeyResolveError, KeyResolver, StaticKeyResolver};
pub use metadata::{DirEntry, PrivateMetadata, RootMetadata};
pub use ops::{MdOps, Submitted};
pub use reconcile::{reconcile_branch, reconcile_folder_id, reconcile_handle};
pub use trust::{KeyTrust, KeyTrustError, LocalKeyTrust};
pub use verify::ChainVerifier;
