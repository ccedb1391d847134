//! Multi-source key acquisition with ordered fallback.
//!
//! Resolution order: local keyring, then each configured key server once,
//! then bundled key files. A server answering "no data" or failing to
//! respond is skipped, not fatal; only exhausting every source is an
//! error, because callers must never proceed without the key.

use tracing::{debug, info, warn};

use super::{KeyId, Keyring};
use crate::error::VerifyError;
use crate::gpg::status::has_event;

impl Keyring {
    /// Resolve and import a public key. `None` means the trust root.
    /// Returns the normalized id that is now guaranteed present.
    pub async fn acquire(&self, id: Option<&str>) -> Result<KeyId, VerifyError> {
        let key = match id {
            Some(raw) => KeyId::normalize(raw)?,
            None => self.trust_root().clone(),
        };

        if self.contains(&key).await? {
            debug!("key {} already present, skipping network lookup", key);
            return Ok(key);
        }

        let _guard = self.write_lock.lock().await;

        // The server list is walked once, in order, never restarted
        for server in &self.key_servers {
            match self
                .runner
                .run(&["--keyserver", server, "--recv-keys", key.long()], None)
                .await
            {
                Ok(result) => {
                    if has_event(&result.status_lines, "IMPORT_OK") {
                        info!("key {} received from {}", key, server);
                        return Ok(key);
                    }
                    if has_event(&result.status_lines, "NODATA") {
                        debug!("{} has no data for {}, trying next server", server, key);
                    } else {
                        debug!(
                            "{} did not deliver {} (exit {}), trying next server",
                            server, key, result.exit_code
                        );
                    }
                }
                Err(VerifyError::StatusTimeout { .. }) => {
                    warn!("{} timed out for {}, trying next server", server, key);
                }
                Err(VerifyError::ProcessStart { .. }) => {
                    warn!("receive from {} could not start, trying next server", server);
                }
                Err(other) => return Err(other),
            }
        }

        // Offline fallback: a key file bundled with the installation
        let long_path = self.bundle_dir.join(format!("{}.key", key.long()));
        let short_path = self.bundle_dir.join(format!("{}.key", key.short()));

        for path in [&long_path, &short_path] {
            if !path.exists() {
                continue;
            }
            let arg = path.to_string_lossy();
            let result = self.runner.run(&["--import", arg.as_ref()], None).await?;
            if result.exit_code == 0 || has_event(&result.status_lines, "IMPORT_OK") {
                info!("key {} imported from bundled file {}", key, path.display());
                return Ok(key);
            }
            warn!(
                "bundled key file {} failed to import (exit {})",
                path.display(),
                result.exit_code
            );
        }

        let err = VerifyError::KeyNotFound {
            key_id: key.long().to_string(),
            long_path,
            short_path,
        };
        err.log_if_security_critical();
        Err(err)
    }
}
