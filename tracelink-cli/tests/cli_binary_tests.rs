//! End-to-end tests that run the `tracelink` binary.

use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn tracelink(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tracelink"))
        .current_dir(dir.path())
        .env("RUST_LOG", "error")
        .env_remove("TRACELINK_RESOLVER_BASE_URL")
        .env_remove("TRACELINK_RESOLVER_AUTH_TOKEN")
        .args(args)
        .output()
        .expect("binary should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_normalize_json_output() {
    let dir = TempDir::new().expect("should create temp dir");

    let output = tracelink(
        &dir,
        &[
            "normalize",
            r#"{"qrHash":"4e98a08e","entityId":"rmb-7"}"#,
            "--output",
            "json",
        ],
    );

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["canonicalId"], "4e98a08e");
    assert_eq!(json["displayId"], "rmb-7");
}

#[test]
fn test_normalize_blank_payload_exits_with_command_error() {
    let dir = TempDir::new().expect("should create temp dir");

    let output = tracelink(&dir, &["normalize", "   "]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_config_validate_missing_file_exits_with_config_error() {
    let dir = TempDir::new().expect("should create temp dir");

    let output = tracelink(&dir, &["config", "validate"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("INVALID"));
}

#[test]
fn test_config_show_redacts_token() {
    let dir = TempDir::new().expect("should create temp dir");
    fs::write(
        dir.path().join("tracelink.toml"),
        "[resolver]\nauth_token = \"super-secret-token\"\n",
    )
    .expect("should write config");

    let output = tracelink(&dir, &["config", "show", "--section", "resolver"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("***REDACTED***"));
    assert!(!stdout.contains("super-secret-token"));
}

#[test]
fn test_resolve_unreachable_backend_degrades_to_identifier() {
    let dir = TempDir::new().expect("should create temp dir");

    // bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    drop(listener);

    fs::write(
        dir.path().join("tracelink.toml"),
        format!("[resolver]\nbase_url = \"http://{addr}\"\ntimeout_secs = 2\n"),
    )
    .expect("should write config");

    let output = tracelink(
        &dir,
        &["resolve", "abc123", "--consumer", "identifier", "--output", "json"],
    );

    assert_eq!(output.status.code(), Some(5));
    let json = stdout_json(&output);
    assert_eq!(json["result"], "degraded");
    assert_eq!(json["projection"]["kind"], "identifier");
    assert_eq!(json["projection"]["value"], "abc123");
}
