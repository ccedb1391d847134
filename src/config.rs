//! Engine configuration and default path resolution.
//!
//! All knobs the verification engine consumes are explicit fields here and
//! are passed into each engine instance at construction. There is no hidden
//! global state; two engines with different configurations can coexist in
//! one process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fingerprint of the release signing key this engine ultimately vouches for.
/// Other keys are trusted only through a certification made by this key.
pub const DEFAULT_TRUST_ROOT: &str = "D1B4C77E0A983F5268FE1B0C4A5D9E3207F6A842";

/// Seconds to wait for the tool's status channel before killing it
pub const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 3;

fn default_tool() -> PathBuf {
    PathBuf::from("gpg")
}

fn default_trust_root() -> String {
    DEFAULT_TRUST_ROOT.to_string()
}

fn default_status_timeout() -> u64 {
    DEFAULT_STATUS_TIMEOUT_SECS
}

fn default_key_servers() -> Vec<String> {
    vec![
        "hkps://keys.openpgp.org".to_string(),
        "hkps://keyserver.ubuntu.com".to_string(),
        "hkp://pgp.mit.edu".to_string(),
    ]
}

fn default_identity() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "nobody".to_string())
}

fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "sigil", "sigil")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

fn default_keyring_home() -> PathBuf {
    data_dir()
        .map(|d| d.join("keyring"))
        .unwrap_or_else(|| PathBuf::from(".sigil/keyring"))
}

fn default_key_bundle_dir() -> PathBuf {
    data_dir()
        .map(|d| d.join("keys"))
        .unwrap_or_else(|| PathBuf::from(".sigil/keys"))
}

/// Configuration for a verification engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the external OpenPGP tool
    #[serde(default = "default_tool")]
    pub tool: PathBuf,

    /// Home directory holding the tool's keyring and trust database.
    /// Shared, persistent, and treated as a singleton per installation.
    #[serde(default = "default_keyring_home")]
    pub keyring_home: PathBuf,

    /// Identity (USER/LOGNAME) the tool runs under
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Fingerprint (or long id) of the trust-root key
    #[serde(default = "default_trust_root")]
    pub trust_root: String,

    /// Deadline for the status channel, in seconds
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// Key servers tried in order during key acquisition
    #[serde(default = "default_key_servers")]
    pub key_servers: Vec<String>,

    /// Directory holding bundled `<id>.key` files for offline fallback
    #[serde(default = "default_key_bundle_dir")]
    pub key_bundle_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tool: default_tool(),
            keyring_home: default_keyring_home(),
            identity: default_identity(),
            trust_root: default_trust_root(),
            status_timeout_secs: default_status_timeout(),
            key_servers: default_key_servers(),
            key_bundle_dir: default_key_bundle_dir(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, falling back to defaults for
    /// absent fields. A missing file yields the default configuration.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config: {}", path.display()))?;
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse engine config: {}", path.display()))
    }
}
