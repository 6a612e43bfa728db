//! Key trust: is this verifying key really a user's, at this revision?

use async_trait::async_trait;
use dashmap::DashMap;
use rootmd_crypto::VerifyingKey;
use rootmd_mdserver::{Revision, UserId};
use std::sync::Arc;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Why a key was not confirmed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyTrustError {
    /// The user never had this key, or not yet at the revision
    #[error("no such key for user {user}")]
    KeyNotFound { user: UserId },

    /// The key was revoked at or before the revision
    #[error("key of user {user} revoked at revision {revoked_at}")]
    KeyRevoked { user: UserId, revoked_at: Revision },

    /// The trust service failed
    #[error("{0}")]
    Unavailable(String),
}

impl KeyTrustError {
    /// True when the key itself is unknown or invalid, as opposed to a service failure
    pub fn is_unverifiable(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::KeyRevoked { .. })
    }
}

/// Confirms that a verifying key belonged to a user at a revision
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyTrust: Send + Sync {
    /// `Ok(())` when `key` was a valid key of `user` at `revision`
    async fn has_verifying_key(
        &self,
        user: &UserId,
        key: &VerifyingKey,
        revision: Revision,
    ) -> Result<(), KeyTrustError>;
}

#[derive(Clone, Debug)]
struct TrustedKey {
    key: VerifyingKey,
    valid_from: Revision,
    revoked_at: Option<Revision>,
}

/// Key trust backed by a local table of user keys
#[derive(Clone, Default)]
pub struct LocalKeyTrust {
    keys: Arc<DashMap<UserId, Vec<TrustedKey>>>,
}

impl LocalKeyTrust {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` for `user` from the first revision on
    pub fn add_key(&self, user: UserId, key: VerifyingKey) {
        self.add_key_from(user, key, Revision::INITIAL);
    }

    /// Trust `key` for `user` starting at `valid_from`
    pub fn add_key_from(&self, user: UserId, key: VerifyingKey, valid_from: Revision) {
        self.keys.entry(user).or_default().push(TrustedKey {
            key,
            valid_from,
            revoked_at: None,
        });
    }

    /// Stop trusting `key` from `revision` on. Returns false if the key is unknown.
    pub fn revoke_key(&self, user: &UserId, key: &VerifyingKey, revision: Revision) -> bool {
        let Some(mut keys) = self.keys.get_mut(user) else {
            return false;
        };
        let mut found = false;
        for trusted in keys.iter_mut().filter(|t| t.key == *key) {
            trusted.revoked_at = Some(revision);
            found = true;
        }
        found
    }
}

#[async_trait]
impl KeyTrust for LocalKeyTrust {
    async fn has_verifying_key(
        &self,
        user: &UserId,
        key: &VerifyingKey,
        revision: Revision,
    ) -> Result<(), KeyTrustError> {
        let not_found = || KeyTrustError::KeyNotFound { user: user.clone() };
        let keys = self.keys.get(user).ok_or_else(not_found)?;
        let trusted = keys
            .iter()
            .find(|t| t.key == *key && t.valid_from <= revision)
            .ok_or_else(not_found)?;

        match trusted.revoked_at {
            Some(revoked_at) if revoked_at <= revision => Err(KeyTrustError::KeyRevoked {
                user: user.clone(),
                revoked_at,
            }),
            _ => Ok(()),
        }
    }
}
