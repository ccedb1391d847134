//! SHA-256 helpers for manifest integrity checks.
//!
//! Digests are bare lowercase hex, matching the manifest document format.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Hash a file's contents, reading it through the async runtime
pub async fn hash_file(path: &Path) -> Result<String> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

/// Hash a file's contents synchronously, streaming in 8 KB chunks
pub fn hash_file_sync(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash a string
pub fn hash_string(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_string_known_value() {
        // sha256 of "hello"
        assert_eq!(
            hash_string("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_file_sync_matches_string() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "hello")?;

        assert_eq!(hash_file_sync(temp_file.path())?, hash_string("hello"));
        Ok(())
    }

    #[tokio::test]
    async fn test_async_and_sync_agree() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        write!(temp_file, "some manifest payload")?;

        let a = hash_file(temp_file.path()).await?;
        let b = hash_file_sync(temp_file.path())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(hash_file_sync(Path::new("/nonexistent/file")).is_err());
    }
}
