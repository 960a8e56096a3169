use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use warden_core::config;
use warden_eventlog::{read_records, Severity};

fn warden_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("warden"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn init_with_cat(home: &Path) {
    warden_cmd(home)
        .args(["init", "--command", "cat"])
        .assert()
        .success()
        .stdout(contains("config.yaml"));
}

#[test]
fn init_writes_config_once() {
    let home = TempDir::new().expect("home");
    init_with_cat(home.path());

    let config = config::load_at(home.path()).expect("load config");
    assert_eq!(config.worker.command, vec!["cat".to_string()]);

    warden_cmd(home.path())
        .args(["init", "--command", "sleep", "5"])
        .assert()
        .success()
        .stdout(contains("already exists"));
    let config = config::load_at(home.path()).expect("reload config");
    assert_eq!(config.worker.command, vec!["cat".to_string()]);
}

#[test]
fn init_requires_a_command() {
    let home = TempDir::new().expect("home");
    warden_cmd(home.path()).arg("init").assert().failure();
}

#[test]
fn service_without_config_points_at_init() {
    let home = TempDir::new().expect("home");
    warden_cmd(home.path())
        .arg("service")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(contains("warden init"));
}

#[cfg(unix)]
#[test]
fn service_stops_on_request_and_records_lifecycle() {
    let home = TempDir::new().expect("home");
    init_with_cat(home.path());

    let output = warden_cmd(home.path())
        .arg("service")
        .write_stdin("{\"cmd\":\"interrogate\"}\n{\"code\":1}\n")
        .output()
        .expect("run service");
    assert!(output.status.success(), "service failed: {output:?}");

    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let states: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("report json");
            value["state"].as_str().expect("state").to_string()
        })
        .collect();
    assert_eq!(
        states,
        vec!["start_pending", "running", "running", "stop_pending"]
    );

    let root = config::default_eventlog_root_at(home.path());
    let records = read_records(&root, "warden", 100).expect("read records");
    assert!(records.iter().all(|r| r.severity != Severity::Error));
    assert!(records
        .iter()
        .any(|r| r.message.contains("warden service starting")));
    assert!(records
        .last()
        .is_some_and(|r| r.message.contains("warden service exited")));

    warden_cmd(home.path())
        .args(["eventlog", "tail", "--lines", "5"])
        .assert()
        .success()
        .stdout(contains("warden service exited"));
}

#[cfg(unix)]
#[test]
fn service_fails_when_host_hangs_up() {
    let home = TempDir::new().expect("home");
    init_with_cat(home.path());

    warden_cmd(home.path())
        .arg("service")
        .write_stdin("{\"cmd\":\"pause\"}\n")
        .assert()
        .failure()
        .stdout(contains("\"paused\""));

    warden_cmd(home.path())
        .args(["eventlog", "tail", "--json"])
        .assert()
        .success()
        .stdout(contains("\"severity\":\"error\"").and(contains("service failed")));
}

#[test]
fn eventlog_install_registers_source() {
    let home = TempDir::new().expect("home");
    init_with_cat(home.path());

    warden_cmd(home.path())
        .args(["eventlog", "install"])
        .assert()
        .success()
        .stdout(contains("installed event source 'warden'"));

    let manifest = config::default_eventlog_root_at(home.path())
        .join("sources")
        .join("warden.json");
    let raw = fs::read_to_string(manifest).expect("manifest");
    assert!(raw.contains("\"error\"") && raw.contains("\"info\""));

    warden_cmd(home.path())
        .args(["eventlog", "tail"])
        .assert()
        .success()
        .stdout(contains("no records"));
}
