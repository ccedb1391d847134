//! Keyring operations: key presence, acquisition, ownertrust, and the
//! chain-of-custody certification check.
//!
//! The keyring home is a shared, persistent resource. Mutating operations
//! on one engine instance are serialized behind an internal lock so
//! concurrent verification requests cannot interleave writes to the trust
//! database. Engines in other processes sharing the same home remain
//! uncoordinated.

mod acquire;
mod key_id;
mod ownertrust;

pub use key_id::KeyId;

use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::VerifyError;
use crate::gpg::runner::GpgRunner;

/// Access to the external tool's key store for one installation
pub struct Keyring {
    runner: GpgRunner,
    /// Trust root exactly as configured (cleaned), for ownertrust records
    trust_root_record: String,
    trust_root: KeyId,
    key_servers: Vec<String>,
    bundle_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Keyring {
    pub fn new(config: &EngineConfig, runner: GpgRunner) -> Result<Self, VerifyError> {
        let cleaned: String = config
            .trust_root
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let trust_root = KeyId::normalize(&cleaned)?;

        Ok(Keyring {
            runner,
            trust_root_record: cleaned,
            trust_root,
            key_servers: config.key_servers.clone(),
            bundle_dir: config.key_bundle_dir.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn trust_root(&self) -> &KeyId {
        &self.trust_root
    }

    /// Whether the keyring already holds the key. No network involved.
    pub async fn contains(&self, id: &KeyId) -> Result<bool, VerifyError> {
        let result = self.runner.run(&["--list-keys", id.long()], None).await?;
        debug!("list-keys {} -> exit {}", id, result.exit_code);
        Ok(result.exit_code == 0)
    }

    /// Chain-of-custody: does the signer's key carry at least one
    /// certification issued by the trust root? Policy trust alone is not
    /// enough for single-file verification; the root must vouch for the
    /// signer directly.
    pub async fn certified_by_root(&self, signer: &KeyId) -> Result<bool, VerifyError> {
        let result = self
            .runner
            .run(&["--list-sigs", "--with-colons", signer.long()], None)
            .await?;
        if result.exit_code != 0 {
            debug!("list-sigs {} failed with exit {}", signer, result.exit_code);
            return Ok(false);
        }

        let certified = certification_issuers(&result.stdout)
            .iter()
            .any(|issuer| self.trust_root.matches(issuer));
        debug!("custody check for {}: certified_by_root={}", signer, certified);
        Ok(certified)
    }
}

/// Issuer key ids of all `sig` records in a colon-format key listing
fn certification_issuers(colons: &str) -> Vec<String> {
    colons
        .lines()
        .filter(|line| line.starts_with("sig:"))
        .filter_map(|line| line.split(':').nth(4))
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}
