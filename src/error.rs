//! Verification error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

use crate::gpg::status::SignatureStatus;

/// Errors produced by the verification engine
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Malformed caller input: bad key id, path traversal, missing file
    #[error("invalid input: {0}")]
    Validation(String),

    /// The external OpenPGP tool could not be started
    #[error("failed to start `{tool}` - is GnuPG installed and on the sanitized PATH?")]
    ProcessStart {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool produced no status output within the configured deadline
    #[error("no status output from `{tool}` within {deadline_secs}s; the process was killed")]
    StatusTimeout { tool: String, deadline_secs: u64 },

    /// The tool emitted output this engine does not understand
    #[error("unexpected output from the signing tool: {0}")]
    Protocol(String),

    /// A public key could not be found in the keyring, on any key server,
    /// or as a bundled key file
    #[error("public key {key_id} not found.\n\nThe keyring was checked, every configured key server was tried, and\nneither bundled key file exists:\n  {long_path}\n  {short_path}\n\nVerification cannot proceed without this key.")]
    KeyNotFound {
        key_id: String,
        long_path: PathBuf,
        short_path: PathBuf,
    },

    /// A signature was present but does not meet the full-assurance bar
    #[error("signature rejected: {flags}\n\nA result is only trustworthy when the signature is mathematically valid\nAND the signer is policy-trusted. Details: {}", .details.join("; "))]
    Untrusted {
        flags: SignatureStatus,
        details: Vec<String>,
    },

    /// Re-importing the ownertrust database failed
    #[error("ownertrust import failed (exit code {exit_code}): {stderr}")]
    OwnertrustImport { exit_code: i32, stderr: String },
}

impl VerifyError {
    /// Log security-critical failures on the dedicated security target
    pub fn log_if_security_critical(&self) {
        match self {
            VerifyError::Untrusted { .. } | VerifyError::KeyNotFound { .. } => {
                tracing::error!(target: "security", "TRUST VIOLATION: {}", self);
            }
            _ => {}
        }
    }
}
