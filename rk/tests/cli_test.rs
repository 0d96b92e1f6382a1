//! Binary smoke tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `rk` with logs and config lookups confined to `home`
fn rk(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rk").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    rk(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("participant"))
        .stdout(predicate::str::contains("client"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_config_prints_defaults() {
    let home = TempDir::new().unwrap();
    rk(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:1099"))
        .stdout(predicate::str::contains("127.0.0.1:5005"));
}

#[test]
fn test_config_reads_explicit_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("cluster.yml");
    std::fs::write(&path, "cluster:\n  coordinator: 127.0.0.1:7777\n").unwrap();

    rk(&home)
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:7777"));
}

#[test]
fn test_config_picks_up_local_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("replikv.yml"), "client:\n  client-id: local-42\n").unwrap();

    rk(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("local-42"));
}

#[test]
fn test_client_rejects_out_of_range_primary() {
    let home = TempDir::new().unwrap();
    rk(&home)
        .args(["client", "1", "--primary", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("client.primary"));
}

#[test]
fn test_missing_subcommand_fails() {
    let home = TempDir::new().unwrap();
    rk(&home).assert().failure();
}
