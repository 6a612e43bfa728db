//! # rootmd
//!
//! Umbrella crate re-exporting the root metadata workspace:
//! - [`crypto`]: signing, hashing and AEAD primitives
//! - [`mdserver`]: wire records and the remote metadata store contract
//! - [`ops`]: verification, chain validation and the metadata operations façade

pub use rootmd_core as ops;
pub use rootmd_crypto as crypto;
pub use rootmd_mdserver as mdserver;
