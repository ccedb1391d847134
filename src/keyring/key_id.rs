//! Key identifier normalization.
//!
//! Identifiers arrive as anything from an 8-character short id to a
//! 40-character fingerprint. The canonical long form is the trailing 16 hex
//! characters; the short form is the trailing 8. Normalization is
//! idempotent.

use std::fmt;

use crate::error::VerifyError;

/// A validated, upper-cased key identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyId(String);

impl KeyId {
    /// Normalize an identifier: trim, upper-case, and keep the trailing 16
    /// characters of anything longer. Rejects non-hex input.
    pub fn normalize(raw: &str) -> Result<KeyId, VerifyError> {
        let cleaned = raw.trim().to_uppercase();
        let id = if cleaned.len() > 16 {
            cleaned[cleaned.len() - 16..].to_string()
        } else {
            cleaned
        };

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VerifyError::Validation(format!(
                "key id {raw:?} is not a hexadecimal identifier"
            )));
        }

        Ok(KeyId(id))
    }

    /// The canonical long form (up to 16 hex characters)
    pub fn long(&self) -> &str {
        &self.0
    }

    /// The short form: trailing 8 characters
    pub fn short(&self) -> &str {
        if self.0.len() > 8 {
            &self.0[self.0.len() - 8..]
        } else {
            &self.0
        }
    }

    /// Whether `candidate` (a fingerprint or id of any length) refers to
    /// this key, judged on the trailing long id
    pub fn matches(&self, candidate: &str) -> bool {
        candidate.trim().to_uppercase().ends_with(&self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
