//! Configuration for metadata operations

use crate::{MdOpsError, Result};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};

/// Default deadline for a single call to the server or a key service
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 30_000;

/// Default cap on the number of revisions a single range fetch may ask for
pub const DEFAULT_MAX_RANGE_LEN: u64 = 1000;

/// Tunables for [`crate::MdOps`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MdOpsConfig {
    /// Deadline in milliseconds for each server, key trust and key resolver call
    pub collaborator_timeout_ms: u64,
    /// Longest range a fetch may request
    pub max_range_len: u64,
    /// Require the last writer to be a folder writer and the last user to be a reader
    pub check_membership: bool,
}

impl Default for MdOpsConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: DEFAULT_COLLABORATOR_TIMEOUT_MS,
            max_range_len: DEFAULT_MAX_RANGE_LEN,
            check_membership: true,
        }
    }
}

impl MdOpsConfig {
    /// Deadline for each collaborator call
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    /// Run a collaborator call under the configured deadline.
    ///
    /// The call's own output, success or failure, is returned untouched.
    pub(crate) async fn bounded<F, T>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.collaborator_timeout(), call)
            .await
            .map_err(|_| MdOpsError::Timeout {
                operation,
                timeout_ms: self.collaborator_timeout_ms,
            })
    }
}
