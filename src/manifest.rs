//! The package manifest: expected file paths and content digests.
//!
//! A manifest is parsed from the body of a verified signed document. The
//! body is a flat key/value text format, one entry per line:
//!
//! ```text
//! # comment
//! bin/tool:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! share/doc/README:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
//! ```
//!
//! The digest is the text after the last `:`, so paths containing colons
//! remain representable. Entry order is irrelevant.

use std::collections::BTreeMap;

use crate::error::VerifyError;

/// Mapping of relative file path to lowercase hex SHA-256 digest.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse a manifest body. Blank lines and `#` comments are ignored;
    /// anything else must be a well-formed `path:digest` entry.
    pub fn parse(body: &str) -> Result<Manifest, VerifyError> {
        let mut entries = BTreeMap::new();

        for (number, line) in body.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (path, digest) = trimmed.rsplit_once(':').ok_or_else(|| {
                VerifyError::Validation(format!(
                    "manifest line {} has no digest separator: {trimmed:?}",
                    number + 1
                ))
            })?;

            let path = path.trim();
            let digest = digest.trim().to_lowercase();
            if path.is_empty()
                || digest.len() != 64
                || !digest.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(VerifyError::Validation(format!(
                    "manifest line {} is not a path with a SHA-256 digest: {trimmed:?}",
                    number + 1
                )));
            }

            entries.insert(path.to_string(), digest);
        }

        Ok(Manifest { entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
