//! Basic CLI E2E tests.
//!
//! Each test gets its own data directory and runs the built binary against
//! the built-in problem list, so no network is needed.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command in `dir` and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_terriyaki"))
        .env("TERRIYAKI_DATA_DIR", dir)
        .env("RUST_LOG", "warn")
        .env_remove("TERRIYAKI_USER")
        .env_remove("TERRIYAKI_TOKEN")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

/// Noon today (UTC), well inside today's task window.
fn today_noon() -> String {
    chrono::Utc::now().format("%Y-%m-%dT12:00:00Z").to_string()
}

/// A data directory configured for the offline problem list.
fn offline_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "problems.source", "static"]);
    assert_eq!(code, 0, "config set failed: {stderr}");
    dir
}

#[test]
fn test_config_roundtrip() {
    let dir = offline_dir();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "problems.source"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "static");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "path"]);
    assert!(stdout.trim().ends_with("config.toml"));

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
}

#[test]
fn test_grind_flow() {
    let dir = offline_dir();
    let d = dir.path();
    run_json(d, &["user", "register", "alice", "alice@example.com"]);
    run_json(d, &["user", "register", "bob", "bob@example.com"]);

    let grind = run_json(
        d,
        &[
            "grind", "create", "--duration", "3", "--budget", "90",
            "--participant", "alice@example.com", "--participant", "bob@example.com",
            "--start", &today_noon(),
        ],
    );
    let grind_id = grind["id"].as_str().unwrap().to_string();
    assert_eq!(grind["participants"].as_array().unwrap().len(), 2);

    let alice = run_json(d, &["--as", "alice@example.com", "task", "today"]);
    let bob = run_json(d, &["--as", "bob@example.com", "task", "today", "--grind", &grind_id]);
    assert!(alice["problem"]["title"].is_string());
    assert_eq!(alice["problem"], bob["problem"]);

    let done = run_json(d, &["--as", "alice@example.com", "task", "finish", "--code", "pass"]);
    assert_eq!(done["completed"], Value::Bool(true));

    let quit = run_json(d, &["--as", "bob@example.com", "grind", "quit", &grind_id]);
    assert_eq!(quit["total_penalty"], 90);

    let (_, stderr, code) = run_cli(d, &["--as", "bob@example.com", "grind", "quit", &grind_id]);
    assert_eq!(code, 5);
    assert!(stderr.contains("error[CONFLICT]"));
}

#[test]
fn test_invitation_flow() {
    let dir = offline_dir();
    let d = dir.path();
    run_json(d, &["user", "register", "alice", "alice@example.com"]);
    run_json(d, &["user", "register", "bob", "bob@example.com"]);

    let grind = run_json(
        d,
        &[
            "--as", "alice@example.com", "grind", "start", "--duration", "2", "--budget", "20",
            "--invite", "bob@example.com", "--start", &today_noon(),
        ],
    );
    assert_eq!(grind["participants"].as_array().unwrap().len(), 1);

    let inbox = run_json(d, &["--as", "bob@example.com", "message", "inbox"]);
    let invitation_id = inbox[0]["id"].as_str().unwrap().to_string();

    let (_, stderr, code) = run_cli(d, &["--as", "alice@example.com", "invite", "accept", &invitation_id]);
    assert_eq!(code, 4, "{stderr}");

    let reply = run_json(d, &["--as", "bob@example.com", "invite", "accept", &invitation_id]);
    assert_eq!(reply["message_type"], "invitation_accepted");

    let standing = run_json(d, &["grind", "standing", grind["id"].as_str().unwrap()]);
    assert_eq!(standing.as_array().unwrap().len(), 2);
}

#[test]
fn test_unknown_actor_and_missing_identity() {
    let dir = offline_dir();
    let (_, stderr, code) = run_cli(dir.path(), &["grind", "list"]);
    assert_eq!(code, 6);
    assert!(stderr.contains("error[UNAUTHORIZED]"));

    let (_, stderr, code) = run_cli(dir.path(), &["--as", "ghost@example.com", "grind", "list"]);
    assert_eq!(code, 3);
    assert!(stderr.contains("error[NOT_FOUND]"));
}

#[test]
fn test_storage_failure_hides_detail() {
    let dir = offline_dir();
    std::fs::write(dir.path().join("terriyaki.db"), "not a sqlite file\n".repeat(256)).unwrap();

    let (_, stderr, code) = run_cli(dir.path(), &["user", "list"]);
    assert_eq!(code, 1, "{stderr}");
    assert!(stderr.contains("error[INTERNAL]: internal error"));
    assert!(!stderr.contains("not a database"));
}
