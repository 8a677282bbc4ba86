//! Command-line tests for the iosctl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// An iosctl command isolated from the caller's environment and config files.
fn iosctl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("iosctl").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("IOSCTL_CONFIG")
        .env_remove("IOSCTL_USER")
        .env_remove("IOSCTL_PASSWORD")
        .env_remove("IOSCTL_ENABLE_SECRET")
        .env_remove("IOSCTL_FORKS");
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_install_help_lists_url() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--backup-name"));
}

#[test]
fn test_install_requires_url() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["install", "--host", "10.255.138.120", "-u", "admin"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--url"));
}

#[test]
fn test_show_requires_commands() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["show", "--host", "10.255.138.120", "-u", "admin"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_output_format() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["--output", "xml", "show", "--host", "r1", "-C", "show version"])
        .assert()
        .code(1);
}

#[test]
fn test_empty_url_rejected_before_connecting() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["install", "--host", "192.0.2.1", "-u", "admin", "--url", "  "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR"));
}

#[test]
fn test_missing_username() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["show", "--host", "192.0.2.1", "-C", "show version"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("username"));
}

#[test]
fn test_missing_commands_file() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args([
            "show",
            "--host",
            "192.0.2.1",
            "-u",
            "admin",
            "--commands-file",
            "does-not-exist.txt",
        ])
        .assert()
        .code(1);
}

#[test]
fn test_missing_explicit_config_file() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args(["--config", "nope.toml", "show", "--host", "r1", "-u", "admin", "-C", "show clock"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn test_invalid_pattern_in_config() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("iosctl.toml");
    fs::write(
        &config,
        "[device.patterns]\nerror = [\"(unclosed\"]\n",
    )
    .unwrap();

    iosctl(&home)
        .args(["--config"])
        .arg(&config)
        .args(["install", "--host", "192.0.2.1", "-u", "admin", "--url", "tftp://10.0.0.1/a.cfg"])
        .assert()
        .code(1);
}

#[test]
fn test_unreachable_device_exit_code() {
    let home = TempDir::new().unwrap();
    let dest = home.path().join("audits");

    iosctl(&home)
        .args(["--port", "1", "--output", "json", "show", "--host", "127.0.0.1", "-u", "admin", "-p", "foo", "-C", "show version", "--dest"])
        .arg(&dest)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"unreachable\""));

    assert!(!dest.exists());
}

#[test]
fn test_empty_backup_name_rejected_before_connecting() {
    let home = TempDir::new().unwrap();
    iosctl(&home)
        .args([
            "install",
            "--host",
            "192.0.2.1",
            "-u",
            "admin",
            "--url",
            "tftp://10.0.0.1/a.cfg",
            "--backup-name",
            "",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("backup name"));
}
