//! Command-line surface tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn watcher() -> Command {
    Command::cargo_bin("finality-watcher").unwrap()
}

/// An address nobody is listening on.
fn dead_server() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[test]
fn help_lists_commands() {
    watcher()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("watches"))
        .stdout(predicate::str::contains("heads"));
}

#[test]
fn run_requires_freq_and_amount() {
    watcher()
        .args(["run", "--freq", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--amount"));
}

#[test]
fn watches_against_dead_server_fails() {
    watcher()
        .args(["--server", &dead_server(), "watches", "--nodes", "http://a:8888"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("watches request failed"));
}

#[test]
fn heads_rejects_duplicate_nodes() {
    watcher()
        .args([
            "heads",
            "--nodes",
            "http://a:8888",
            "http://a:8888/",
            "--max-spread",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid node list"));
}

#[test]
fn serve_rejects_bad_config() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "[schedule]\npoll_interval_ms = 0").unwrap();

    watcher()
        .args(["serve", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
