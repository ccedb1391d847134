//! Ownertrust management: marking the trust root ultimately trusted.
//!
//! The ownertrust database belongs to the external tool; this module only
//! ever appends to it and never deletes an entry. Re-running against an
//! already-trusted root performs no mutation.

use tracing::{debug, info};

use super::Keyring;
use crate::error::VerifyError;
use crate::keyring::KeyId;

/// Every ownertrust export starts with this comment header
const EXPORT_HEADER: &str = "# List of assigned trustvalues";

/// Ultimate ownertrust, in the tool's export encoding
const ULTIMATE: u8 = 6;

impl Keyring {
    /// Ensure the trust-root key is present and marked ultimately trusted.
    pub async fn ensure_root_trusted(&self) -> Result<(), VerifyError> {
        self.acquire(None).await?;

        let _guard = self.write_lock.lock().await;

        let export = self.runner.run(&["--export-ownertrust"], None).await?;
        if !export_is_wellformed(&export.stdout) {
            return Err(VerifyError::Protocol(format!(
                "ownertrust export does not start with {EXPORT_HEADER:?}"
            )));
        }

        if root_entry_present(&export.stdout, self.trust_root()) {
            debug!("trust root {} already in ownertrust database", self.trust_root());
            return Ok(());
        }

        let updated = append_root_entry(&export.stdout, &self.trust_root_record);
        let result = self
            .runner
            .run(&["--import-ownertrust"], Some(updated.as_bytes()))
            .await?;
        if result.exit_code != 0 {
            return Err(VerifyError::OwnertrustImport {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        info!("trust root {} marked ultimately trusted", self.trust_root());
        Ok(())
    }
}

fn export_is_wellformed(export: &str) -> bool {
    export.lines().next().is_some_and(|l| l.starts_with(EXPORT_HEADER))
}

/// Whether any entry refers to the root key, whatever its trust level
fn root_entry_present(export: &str, root: &KeyId) -> bool {
    export
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .filter_map(|line| line.split(':').next())
        .any(|fingerprint| root.matches(fingerprint))
}

fn append_root_entry(export: &str, root_record: &str) -> String {
    let mut updated = export.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("{root_record}:{ULTIMATE}:\n"));
    updated.push_str("# trust root marked ultimately trusted\n");
    updated
}
