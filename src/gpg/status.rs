//! Status-protocol interpretation.
//!
//! The external tool reports one structured event per line on its status
//! channel. This module reduces that flat event stream into a single
//! immutable [`Verdict`] in one place, so no string-prefix branching leaks
//! into call sites.
//!
//! A verdict carries two independent axes: `valid` (a mathematically checked
//! signature line was observed) and `trust` (the tool's own policy marks the
//! signer fully or ultimately trusted). Valid-but-untrusted and
//! trusted-but-invalid are both representable; callers requiring full
//! assurance must demand both.

use std::fmt;

use crate::error::VerifyError;
use crate::keyring::KeyId;

/// Marker the tool prepends to every status line
const STATUS_MARKER: &str = "[GNUPG:] ";

/// Combinable signature state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignatureStatus(u16);

impl SignatureStatus {
    pub const GOOD: SignatureStatus = SignatureStatus(1 << 0);
    pub const TAMPERED: SignatureStatus = SignatureStatus(1 << 1);
    pub const INVALID: SignatureStatus = SignatureStatus(1 << 2);
    pub const UNSIGNED: SignatureStatus = SignatureStatus(1 << 3);
    pub const UNSUPPORTED: SignatureStatus = SignatureStatus(1 << 4);
    pub const EXPIRED: SignatureStatus = SignatureStatus(1 << 5);
    pub const REVOKED: SignatureStatus = SignatureStatus(1 << 6);
    pub const TRUSTED: SignatureStatus = SignatureStatus(1 << 7);

    pub const fn empty() -> SignatureStatus {
        SignatureStatus(0)
    }

    pub const fn contains(self, other: SignatureStatus) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: SignatureStatus) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: SignatureStatus) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: SignatureStatus) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for SignatureStatus {
    type Output = SignatureStatus;

    fn bitor(self, rhs: SignatureStatus) -> SignatureStatus {
        SignatureStatus(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SignatureStatus {
    fn bitor_assign(&mut self, rhs: SignatureStatus) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(SignatureStatus, &str); 8] = [
            (SignatureStatus::GOOD, "GOOD"),
            (SignatureStatus::TAMPERED, "TAMPERED"),
            (SignatureStatus::INVALID, "INVALID"),
            (SignatureStatus::UNSIGNED, "UNSIGNED"),
            (SignatureStatus::UNSUPPORTED, "UNSUPPORTED"),
            (SignatureStatus::EXPIRED, "EXPIRED"),
            (SignatureStatus::REVOKED, "REVOKED"),
            (SignatureStatus::TRUSTED, "TRUSTED"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "NONE")?;
        }
        Ok(())
    }
}

/// The outcome of one verification run
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    /// Combined signature state
    pub flags: SignatureStatus,
    /// A mathematically checked signature was observed
    pub valid: bool,
    /// The tool's policy marks the signer fully/ultimately trusted
    pub trust: bool,
    /// Signing key, when the tool identified one
    pub signer: Option<KeyId>,
    /// Signature creation time (epoch seconds), when reported
    pub timestamp: Option<i64>,
    /// Human-readable findings, in observation order
    pub details: Vec<String>,
}

impl Verdict {
    /// An unsigned-package verdict
    pub fn unsigned() -> Verdict {
        Verdict {
            flags: SignatureStatus::UNSIGNED,
            details: vec!["unsigned".to_string()],
            ..Verdict::default()
        }
    }

    /// True when the signature is both mathematically valid and
    /// policy-trusted, with no degradation flag set
    pub fn is_fully_trusted(&self) -> bool {
        self.valid
            && self.trust
            && !self.flags.intersects(
                SignatureStatus::TAMPERED
                    | SignatureStatus::INVALID
                    | SignatureStatus::REVOKED
                    | SignatureStatus::EXPIRED
                    | SignatureStatus::UNSIGNED,
            )
    }

    /// The signature line referenced a key the keyring does not hold
    pub fn missing_public_key(&self) -> bool {
        self.flags.contains(SignatureStatus::INVALID) && !self.valid
    }

    /// Record an integrity finding. Degradation always clears GOOD;
    /// GOOD and TAMPERED are never simultaneously asserted.
    pub fn degrade(&mut self, detail: String) {
        self.flags.remove(SignatureStatus::GOOD);
        self.flags.insert(SignatureStatus::TAMPERED);
        self.details.push(detail);
    }

    /// Convert an insufficient verdict into a typed failure for callers
    /// that require full assurance
    pub fn require_trusted(&self) -> Result<(), VerifyError> {
        if self.is_fully_trusted() {
            return Ok(());
        }
        let err = VerifyError::Untrusted {
            flags: self.flags,
            details: self.details.clone(),
        };
        err.log_if_security_critical();
        Err(err)
    }
}

/// Whether an event with the given keyword was observed
pub fn has_event(status_lines: &[String], keyword: &str) -> bool {
    status_lines.iter().any(|line| {
        line.strip_prefix(STATUS_MARKER)
            .unwrap_or(line)
            .split_whitespace()
            .next()
            == Some(keyword)
    })
}

/// Reduce status lines into a verdict. Pure; unrecognized events are
/// ignored.
pub fn evaluate(status_lines: &[String]) -> Verdict {
    let mut verdict = Verdict::default();

    for line in status_lines {
        let event = line.strip_prefix(STATUS_MARKER).unwrap_or(line);
        let tokens: Vec<&str> = event.split_whitespace().collect();
        let Some(&keyword) = tokens.first() else {
            continue;
        };

        match keyword {
            "VALIDSIG" => {
                verdict.valid = true;
                verdict.flags.insert(SignatureStatus::GOOD);
                if let Some(fpr) = tokens.get(1) {
                    if let Ok(id) = KeyId::normalize(fpr) {
                        verdict.signer = Some(id);
                    }
                }
                // VALIDSIG <fpr> <sig-date> <sig-epoch> ...
                verdict.timestamp = tokens.get(3).and_then(|t| t.parse::<i64>().ok());
            }
            "BADSIG" => {
                verdict.flags.insert(SignatureStatus::TAMPERED);
                verdict.details.push("tampered".to_string());
            }
            "ERRSIG" => {
                verdict.flags.insert(SignatureStatus::INVALID);
                verdict.details.push("unknown signature".to_string());
                if verdict.signer.is_none() {
                    if let Some(keyid) = tokens.get(1) {
                        if let Ok(id) = KeyId::normalize(keyid) {
                            verdict.signer = Some(id);
                        }
                    }
                }
                // ERRSIG <keyid> <pkalgo> <hashalgo> <class> <time> <rc>
                if tokens.get(6) == Some(&"4") {
                    verdict.flags.insert(SignatureStatus::UNSUPPORTED);
                    verdict.details.push("unsupported algorithm".to_string());
                }
            }
            "REVKEYSIG" => {
                verdict.flags.insert(SignatureStatus::REVOKED);
                verdict.details.push("signing key revoked".to_string());
            }
            "EXPKEYSIG" => {
                verdict.flags.insert(SignatureStatus::EXPIRED);
                verdict.details.push("signing key expired".to_string());
            }
            "TRUST_ULTIMATE" | "TRUST_FULLY" => {
                verdict.trust = true;
                verdict.flags.insert(SignatureStatus::TRUSTED);
            }
            _ => {}
        }
    }

    // A tamper finding outweighs any GOOD event, whatever the line order
    if verdict.flags.contains(SignatureStatus::TAMPERED) {
        verdict.flags.remove(SignatureStatus::GOOD);
    }

    verdict
}
