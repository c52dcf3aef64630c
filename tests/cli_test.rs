use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};

fn relay_command() -> Command {
    let mut cmd = Command::new(cargo_bin!("pi-relay"));
    for var in [
        "PI_API_KEY",
        "PI_API_KEY_FILE",
        "RELAY_DB_PATH",
        "PORT",
        "RELAY_BIND",
        "PI_API_TIMEOUT_SECS",
        "RELAY_CLAIM_TTL_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Reads stderr until the relay reports its address; returns the log so far.
fn wait_for_listen(child: &mut Child) -> (Option<String>, String) {
    let stderr = child.stderr.take().expect("stderr is piped");
    let mut log = String::new();

    for line in BufReader::new(stderr).lines() {
        let line = line.expect("Failed to read relay stderr");
        log.push_str(&line);
        log.push('\n');
        if let Some((_, address)) = line.split_once("Relay listening on ") {
            return (Some(address.trim().to_string()), log);
        }
    }
    (None, log)
}

#[test]
fn test_missing_api_key_fails() {
    relay_command()
        .args(["--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PI_API_KEY"));
}

#[test]
fn test_invalid_bind_address_fails() {
    relay_command()
        .args(["--api-key", "k", "--bind", "not-an-ip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid listen address"));
}

#[test]
fn test_claim_ttl_not_above_timeout_fails() {
    relay_command()
        .args(["--api-key", "k", "--claim-ttl-secs", "1", "--timeout-secs", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RELAY_CLAIM_TTL_SECS"));
}

#[test]
fn test_relay_serves_health() {
    let mut child = relay_command()
        .args(["--api-key", "test-key", "--bind", "127.0.0.1", "--port", "0"])
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stderr(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .expect("Failed to execute command");

    let (address, log) = wait_for_listen(&mut child);
    let address = address.unwrap_or_else(|| panic!("relay never started:\n{log}"));

    let mut stream = TcpStream::connect(&address).unwrap();
    write!(
        stream,
        "GET /health HTTP/1.1\r\nHost: {address}\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    child.kill().ok();
    child.wait().ok();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"ok"}"#));
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut child = relay_command()
        .args(["--api-key", "test-key", "--bind", "127.0.0.1", "--port", "0"])
        .args(["--db-path", "some_db"])
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stderr(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .expect("Failed to execute command");

    let (address, log) = wait_for_listen(&mut child);
    child.kill().ok();
    child.wait().ok();

    assert!(address.is_some(), "relay never started:\n{log}");
    assert!(log.contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut child = relay_command()
        .args(["--api-key", "test-key", "--bind", "127.0.0.1", "--port", "0"])
        .arg("--db-path")
        .arg(&db_path)
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stderr(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .expect("Failed to execute command");

    let (address, log) = wait_for_listen(&mut child);
    child.kill().ok();
    child.wait().ok();

    assert!(address.is_some(), "relay never started:\n{log}");
    assert!(!log.contains("WARNING"));
    assert!(log.contains("Using RocksDB payment store"));
}
