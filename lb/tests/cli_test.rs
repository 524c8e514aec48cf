//! Tests for the `lb` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// `lb` isolated from the user's config and log directories
fn lb(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lb").unwrap();
    cmd.current_dir(home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home);
    cmd
}

#[test]
fn test_help() {
    let temp = tempdir().unwrap();
    lb(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("worker"))
        .stdout(predicate::str::contains("broker"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_local_run_writes_final_snapshot() {
    let temp = tempdir().unwrap();
    let out = temp.path().join("snapshots");
    let events = temp.path().join("events.jsonl");

    lb(temp.path())
        .args(["run", "--local-workers", "2", "--width", "8", "--height", "8", "--turns", "5"])
        .arg("--out-dir")
        .arg(&out)
        .arg("--events-log")
        .arg(&events)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Quitting"))
        .stdout(predicate::str::contains("done"));

    let snapshot = fs::read_to_string(out.join("8x8x5.txt")).unwrap();
    assert_eq!(snapshot.lines().count(), 8);
    assert!(snapshot.lines().all(|line| line.len() == 8));

    let log = fs::read_to_string(&events).unwrap();
    assert!(log.contains("FinalTurnComplete"));
}

#[test]
fn test_run_without_workers_fails() {
    let temp = tempdir().unwrap();
    lb(temp.path())
        .args(["run", "--local-workers", "0", "--width", "8", "--height", "8", "--turns", "5"])
        .arg("--out-dir")
        .arg(temp.path().join("snapshots"))
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no workers available"));
}

#[test]
fn test_run_rejects_bad_density() {
    let temp = tempdir().unwrap();
    lb(temp.path())
        .args(["run", "--local-workers", "1", "--density", "1.5"])
        .arg("--out-dir")
        .arg(temp.path().join("snapshots"))
        .write_stdin("")
        .assert()
        .failure();
}

#[test]
fn test_ping_unreachable_fails() {
    let temp = tempdir().unwrap();
    let dead = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    lb(temp.path())
        .args(["ping", &dead])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No answer from"));
}

#[test]
fn test_run_log_appends_across_processes() {
    let temp = tempdir().unwrap();
    for _ in 0..2 {
        lb(temp.path())
            .args(["run", "--local-workers", "1", "--width", "4", "--height", "4", "--turns", "1"])
            .arg("--out-dir")
            .arg(temp.path().join("snapshots"))
            .write_stdin("")
            .assert()
            .success();
    }

    let logs = temp.path().join("data").join("lifebroker").join("logs");
    let log = fs::read_to_string(logs.join("lifebroker-run.log")).unwrap();
    assert_eq!(log.matches("Logging initialized").count(), 2);
    assert!(!logs.join("lifebroker-worker.log").exists());
}

#[test]
fn test_config_load_is_logged_at_config_level() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("lb.yml");
    fs::write(&config, "log-level: debug\n").unwrap();

    lb(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "--local-workers", "1", "--width", "4", "--height", "4", "--turns", "1"])
        .arg("--out-dir")
        .arg(temp.path().join("snapshots"))
        .write_stdin("")
        .assert()
        .success();

    let log = fs::read_to_string(temp.path().join("data/lifebroker/logs/lifebroker-run.log")).unwrap();
    assert!(log.contains("level: debug"));
    assert!(log.contains("Loaded config from"));
}
