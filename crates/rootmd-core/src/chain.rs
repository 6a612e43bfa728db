//! Revision chain validation
//!
//! A range is ordered newest first. Each record must be the direct successor
//! of the one after it: one revision higher, and its previous root equal to
//! the content hash of that record.

use crate::{metadata::RootMetadata, MdOpsError, Result};
use rootmd_mdserver::Codec;
use tracing::warn;

/// Check that `records` (newest first) form one unbroken chain.
///
/// Empty and single-record ranges pass trivially.
pub fn validate_chain<C: Codec>(records: &[RootMetadata], codec: &C) -> Result<()> {
    for pair in records.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);

        if older.revision().next() != Some(newer.revision()) {
            warn!(newer = %newer.revision(), older = %older.revision(), "revision gap in range");
            return Err(MdOpsError::RevisionGap {
                newer: newer.revision(),
                older: older.revision(),
            });
        }

        let expected = older.md_id(codec)?;
        if newer.prev_root() != expected {
            warn!(revision = %newer.revision(), "prev root does not match predecessor");
            return Err(MdOpsError::BrokenChain {
                revision: newer.revision(),
                expected,
                actual: newer.prev_root(),
            });
        }
    }
    Ok(())
}
