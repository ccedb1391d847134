//! The verification engine: package and single-file verification built on
//! the status protocol, key acquisition, and the chain-of-custody check.
//!
//! One engine instance serves one installation. It owns its configuration
//! outright; nothing is read from process-global state.

use std::path::Path;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::VerifyError;
use crate::gpg::runner::{GpgRunner, ProcessResult};
use crate::gpg::status::{self, SignatureStatus, Verdict};
use crate::hasher;
use crate::keyring::{KeyId, Keyring};
use crate::layout::{Destination, PackageLayout};
use crate::manifest::Manifest;

pub struct TrustEngine {
    runner: GpgRunner,
    keyring: Keyring,
    layout: Box<dyn PackageLayout>,
}

impl TrustEngine {
    pub fn new(
        config: EngineConfig,
        layout: Box<dyn PackageLayout>,
    ) -> Result<Self, VerifyError> {
        let runner = GpgRunner::new(&config);
        let keyring = Keyring::new(&config, runner.clone())?;
        Ok(TrustEngine {
            runner,
            keyring,
            layout,
        })
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// Resolve and import a public key (`None` = trust root); see the
    /// keyring module for the fallback order
    pub async fn acquire_key(&self, id: Option<&str>) -> Result<KeyId, VerifyError> {
        self.keyring.acquire(id).await
    }

    /// Idempotently mark the trust root ultimately trusted
    pub async fn ensure_root_trusted(&self) -> Result<(), VerifyError> {
        self.keyring.ensure_root_trusted().await
    }

    /// Verify a signed file against the full trust bar: mathematical
    /// validity, policy trust, and a trust-root certification on the
    /// signer's key. A signer is trusted because the root vouches for it,
    /// not merely because the keyring happens to mark it trusted.
    pub async fn verify_signed_file(&self, path: &Path) -> Result<bool, VerifyError> {
        if !path.exists() {
            return Err(VerifyError::Validation(format!(
                "signed file does not exist: {}",
                path.display()
            )));
        }

        let arg = path.to_string_lossy();
        let (verdict, _) = self.verify_with_retry(&["--verify", arg.as_ref()]).await?;

        if !(verdict.valid && verdict.trust) {
            info!(
                "signature on {} rejected: {} ({})",
                path.display(),
                verdict.flags,
                verdict.details.join("; ")
            );
            return Ok(false);
        }

        let Some(signer) = &verdict.signer else {
            return Ok(false);
        };
        self.keyring.certified_by_root(signer).await
    }

    /// Verify a package's signed manifest and cross-check every checkable
    /// entry against the on-disk destination hashes.
    pub async fn verify_package(&self, name: &str) -> Result<Verdict, VerifyError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(VerifyError::Validation(format!(
                "package name {name:?} is empty or contains a path separator"
            )));
        }

        let document = match self.layout.signature_document(name) {
            Some(path) if path.exists() => path,
            _ => {
                info!("package {} has no manifest signature document", name);
                return Ok(Verdict::unsigned());
            }
        };

        let arg = document.to_string_lossy();
        let (sig_verdict, result) =
            self.verify_with_retry(&["--decrypt", arg.as_ref()]).await?;

        if !(sig_verdict.valid && sig_verdict.trust) {
            info!(
                "manifest signature for {} rejected: {}",
                name, sig_verdict.flags
            );
            return Ok(sig_verdict);
        }

        let manifest = Manifest::parse(&result.stdout)?;
        debug!("manifest for {} lists {} entries", name, manifest.len());

        // The manifest's own authenticity is settled; only faithfulness of
        // the disk state can degrade the verdict from here on
        let mut verdict = Verdict {
            flags: SignatureStatus::GOOD | SignatureStatus::TRUSTED,
            valid: true,
            trust: true,
            signer: sig_verdict.signer,
            timestamp: sig_verdict.timestamp,
            details: Vec::new(),
        };

        for (entry, expected) in manifest.entries() {
            let destination = match self.layout.destination(name, entry) {
                Destination::NotCheckable => {
                    debug!("entry {} is not checkable, skipping", entry);
                    continue;
                }
                Destination::File(path) => path,
            };

            if !destination.exists() {
                verdict.degrade(format!("{entry} missing"));
                continue;
            }

            match hasher::hash_file(&destination).await {
                Ok(actual) if actual.eq_ignore_ascii_case(expected) => {}
                Ok(_) => verdict.degrade(format!("{entry} altered")),
                Err(e) => {
                    debug!("hashing {} failed: {e:#}", destination.display());
                    verdict.degrade(format!("{entry} altered"));
                }
            }
        }

        if verdict.flags.contains(SignatureStatus::TAMPERED) {
            tracing::error!(
                target: "security",
                "package {} failed integrity check: {}",
                name,
                verdict.details.join("; ")
            );
        } else {
            info!("package {} verified: {}", name, verdict.flags);
        }

        Ok(verdict)
    }

    /// Run a verification operation; on a missing-public-key verdict,
    /// acquire the signer's key and re-run exactly once. No other failure
    /// is retried.
    async fn verify_with_retry(
        &self,
        args: &[&str],
    ) -> Result<(Verdict, ProcessResult), VerifyError> {
        let result = self.runner.run(args, None).await?;
        let verdict = status::evaluate(&result.status_lines);

        if verdict.missing_public_key() {
            if let Some(signer) = verdict.signer.clone() {
                debug!("public key {} missing, acquiring and retrying once", signer);
                self.keyring.acquire(Some(signer.long())).await?;

                let result = self.runner.run(args, None).await?;
                let verdict = status::evaluate(&result.status_lines);
                return Ok((verdict, result));
            }
        }

        Ok((verdict, result))
    }
}
