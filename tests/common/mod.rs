//! Shared fixtures: a scriptable stand-in for the external OpenPGP tool
//! and an engine wired to a temporary package tree.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sigil::{DirLayout, EngineConfig, TrustEngine};

/// Trust-root fingerprint used across the integration tests
pub const ROOT_FPR: &str = "D1B4C77E0A983F5268FE1B0C4A5D9E3207F6A842";
/// Long id of [`ROOT_FPR`]
pub const ROOT_LONG: &str = "4A5D9E3207F6A842";

/// A second signing key, certified (or not) by the root
pub const SIGNER_FPR: &str = "77AACF0E552D9B2A41E2B7698CE1A0D4F3B5C6D7";

/// Write an executable `sh` script standing in for the tool. Bodies can
/// dispatch on the operation flag; the runner's base flags arrive first
/// and are exact-match distinct from every operation flag.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("gpg-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Opt-in test diagnostics via RUST_LOG
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build an engine whose tool is the given script and whose packages live
/// under `<temp>/packages/<name>/`
pub fn engine_with_tool(dir: &TempDir, body: &str) -> TrustEngine {
    init_logging();
    let tool = write_tool(dir.path(), body);
    let packages = packages_dir(dir);
    let keyring_home = dir.path().join("keyring");
    let key_bundle_dir = dir.path().join("keys");
    std::fs::create_dir_all(&packages).unwrap();
    std::fs::create_dir_all(&keyring_home).unwrap();
    std::fs::create_dir_all(&key_bundle_dir).unwrap();

    let config = EngineConfig {
        tool,
        keyring_home,
        key_bundle_dir,
        trust_root: ROOT_FPR.to_string(),
        key_servers: vec![
            "hkps://first.example".to_string(),
            "hkps://second.example".to_string(),
        ],
        status_timeout_secs: 5,
        ..EngineConfig::default()
    };

    TrustEngine::new(config, Box::new(DirLayout::new(packages))).unwrap()
}

pub fn packages_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("packages")
}

/// Lay out a package directory with the given files and manifest body
pub fn install_package(dir: &TempDir, name: &str, files: &[(&str, &str)], manifest: &str) {
    let root = packages_dir(dir).join(name);
    for (rel, content) in files {
        let dest = root.join(rel);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(dest, content).unwrap();
    }
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("manifest.asc"), manifest).unwrap();
}

pub fn sha256(content: &str) -> String {
    sigil::hasher::hash_string(content)
}

/// Stub body: "decrypt" the manifest document by printing it, then report
/// a valid, ultimately trusted signature by the root key
pub fn trusted_decrypt_body() -> String {
    format!(
        r#"op=""
for a in "$@"; do
  case "$a" in
    --decrypt) op=decrypt ;;
  esac
  last="$a"
done
if [ "$op" = decrypt ]; then
  cat "$last"
  echo "[GNUPG:] VALIDSIG {ROOT_FPR} 2026-01-10 1768003200 0 4 0 1 10 00" >&3
  echo "[GNUPG:] TRUST_ULTIMATE" >&3
  exit 0
fi
exit 2"#
    )
}
