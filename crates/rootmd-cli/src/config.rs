//! Simulation configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `ROOTMD_`-prefixed environment variables. Nested keys use a
//! double underscore, e.g. `ROOTMD_MD_OPS__MAX_RANGE_LEN`.

use rootmd_core::MdOpsConfig;
use rootmd_crypto::AeadCipher;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ROOTMD";

/// Configuration of a simulation run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// User submitting the revisions
    pub user: String,
    /// Folder handle, e.g. `alice,bob#carol`
    pub handle: String,
    /// Simulate a public folder
    pub public: bool,
    /// Number of revisions to submit
    pub revisions: u64,
    /// Cipher for sealing private payloads (`aes256gcm` or `chacha20poly1305`)
    pub cipher: AeadCipher,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Metadata operation tunables
    pub md_ops: MdOpsConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            user: "alice".to_string(),
            handle: "alice,bob#carol".to_string(),
            public: false,
            revisions: 5,
            cipher: AeadCipher::default(),
            json_logs: false,
            md_ops: MdOpsConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&CliConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: CliConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.revisions == 0 {
            anyhow::bail!("revisions must be at least 1");
        }
        if self.revisions > self.md_ops.max_range_len {
            anyhow::bail!(
                "revisions ({}) exceeds md_ops.max_range_len ({})",
                self.revisions,
                self.md_ops.max_range_len
            );
        }
        Ok(())
    }
}
