//! Key acquisition: keyring short-circuit, ordered key-server walk, and
//! bundled-file fallback

mod common;

use common::*;
use pretty_assertions::assert_eq;
use sigil::VerifyError;
use tempfile::TempDir;

fn read_log(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("calls.log")).unwrap_or_default()
}

/// Stub that logs every invocation and answers each operation per the
/// given `case` arms
fn logging_body(dir: &TempDir, list_arm: &str, recv_arm: &str, import_arm: &str) -> String {
    let log = dir.path().join("calls.log");
    format!(
        r#"op=""
for a in "$@"; do
  case "$a" in
    --list-keys) op=list ;;
    --recv-keys) op=recv ;;
    --import) op=import ;;
  esac
done
echo "$op $@" >> "{log}"
case "$op" in
  list) {list_arm} ;;
  recv) {recv_arm} ;;
  import) {import_arm} ;;
  *) exit 2 ;;
esac"#,
        log = log.display(),
    )
}

#[tokio::test]
async fn present_key_skips_the_network() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(&dir, "exit 0", "exit 0", "exit 0");
    let engine = engine_with_tool(&dir, &body);

    let key = engine.acquire_key(Some(SIGNER_FPR)).await.unwrap();

    assert_eq!(key.long(), "8CE1A0D4F3B5C6D7");
    let log = read_log(&dir);
    assert_eq!(log.lines().filter(|l| l.starts_with("list")).count(), 1);
    assert_eq!(log.lines().filter(|l| l.starts_with("recv")).count(), 0);
}

#[tokio::test]
async fn default_lookup_targets_the_trust_root() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(&dir, "exit 0", "exit 2", "exit 2");
    let engine = engine_with_tool(&dir, &body);

    let key = engine.acquire_key(None).await.unwrap();
    assert_eq!(key.long(), ROOT_LONG);
}

#[tokio::test]
async fn exhausted_sources_name_both_bundle_paths() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(
        &dir,
        "exit 2",
        r#"echo "[GNUPG:] NODATA 1" >&3; exit 2"#,
        "exit 2",
    );
    let engine = engine_with_tool(&dir, &body);

    let result = engine.acquire_key(Some(SIGNER_FPR)).await;

    let Err(VerifyError::KeyNotFound {
        key_id,
        long_path,
        short_path,
    }) = result
    else {
        panic!("expected KeyNotFound, got {result:?}");
    };
    assert_eq!(key_id, "8CE1A0D4F3B5C6D7");
    assert!(long_path.ends_with("8CE1A0D4F3B5C6D7.key"));
    assert!(short_path.ends_with("F3B5C6D7.key"));

    // the server list was walked once, in order, never restarted
    let log = read_log(&dir);
    let servers: Vec<&str> = log
        .lines()
        .filter(|l| l.starts_with("recv"))
        .map(|l| {
            if l.contains("first.example") {
                "first"
            } else {
                "second"
            }
        })
        .collect();
    assert_eq!(servers, vec!["first", "second"]);
}

#[tokio::test]
async fn first_answering_server_stops_the_walk() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(
        &dir,
        "exit 2",
        r#"echo "[GNUPG:] IMPORT_OK 1 77AACF0E552D9B2A41E2B7698CE1A0D4F3B5C6D7" >&3; exit 0"#,
        "exit 2",
    );
    let engine = engine_with_tool(&dir, &body);

    engine.acquire_key(Some(SIGNER_FPR)).await.unwrap();

    let log = read_log(&dir);
    let recv_lines: Vec<&str> = log.lines().filter(|l| l.starts_with("recv")).collect();
    assert_eq!(recv_lines.len(), 1);
    assert!(recv_lines[0].contains("first.example"));
}

#[tokio::test]
async fn bundled_key_file_is_the_last_resort() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(
        &dir,
        "exit 2",
        r#"echo "[GNUPG:] NODATA 1" >&3; exit 2"#,
        r#"echo "[GNUPG:] IMPORT_OK 1" >&3; exit 0"#,
    );
    let engine = engine_with_tool(&dir, &body);
    std::fs::write(dir.path().join("keys").join("F3B5C6D7.key"), "key material").unwrap();

    engine.acquire_key(Some(SIGNER_FPR)).await.unwrap();

    let log = read_log(&dir);
    let import_line = log.lines().find(|l| l.starts_with("import")).unwrap();
    assert!(import_line.contains("F3B5C6D7.key"));
}

#[tokio::test]
async fn long_id_bundle_file_wins_over_short() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(
        &dir,
        "exit 2",
        r#"echo "[GNUPG:] NODATA 1" >&3; exit 2"#,
        r#"echo "[GNUPG:] IMPORT_OK 1" >&3; exit 0"#,
    );
    let engine = engine_with_tool(&dir, &body);
    for name in ["8CE1A0D4F3B5C6D7.key", "F3B5C6D7.key"] {
        std::fs::write(dir.path().join("keys").join(name), "key material").unwrap();
    }

    engine.acquire_key(Some(SIGNER_FPR)).await.unwrap();

    let log = read_log(&dir);
    let import_line = log.lines().find(|l| l.starts_with("import")).unwrap();
    assert!(import_line.contains("8CE1A0D4F3B5C6D7.key"));
}

#[tokio::test]
async fn non_hex_id_is_rejected_before_any_invocation() {
    let dir = TempDir::new().unwrap();
    let body = logging_body(&dir, "exit 0", "exit 0", "exit 0");
    let engine = engine_with_tool(&dir, &body);

    let result = engine.acquire_key(Some("not-a-key")).await;
    assert!(matches!(result, Err(VerifyError::Validation(_))));
    assert_eq!(read_log(&dir), "");
}
