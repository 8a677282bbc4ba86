//! Integration tests for the audit sequence and audit log files.

mod common;

use std::fs;

use common::*;
use iosctl::network::{AuditLogWriter, Auditor, Stage};
use iosctl::Error;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn commands(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_audit_collects_outputs_in_order() {
    let mock = MockTransport::privileged();
    let auditor = Auditor::new(mock.shared());
    let list = commands(&["show version", "show running-config", "show ip interface brief"]);

    let report = auditor.run(&device("r1"), &list).await;

    assert!(report.is_success());
    assert_eq!(report.results.len(), 3);
    for (result, command) in report.results.iter().zip(&list) {
        assert_eq!(&result.command, command);
        assert!(result.output.contains(&format!("output of {}", command)));
    }
    assert_eq!(mock.commands_to("r1"), list);
    assert_eq!(mock.close_count(), 1);
}

#[tokio::test]
async fn test_audit_without_secret_never_elevates() {
    let mock = MockTransport::user_mode();
    let report = Auditor::new(mock.shared())
        .run(&device("r1"), &commands(&["show clock"]))
        .await;

    assert!(report.is_success());
    assert_eq!(mock.sent_to("r1"), commands(&["show clock"]));
    assert!(report.hostname.is_none());
}

#[tokio::test]
async fn test_audit_elevates_with_secret() {
    let mock = MockTransport::user_mode();
    let report = Auditor::new(mock.shared())
        .run(&device_with_secret("r1"), &commands(&["show running-config"]))
        .await;

    assert!(report.is_success());
    assert_eq!(
        mock.sent_to("r1"),
        commands(&["", "enable", SECRET_MARKER, "show running-config"])
    );
    assert_eq!(report.hostname.as_deref(), Some("router"));
    assert_eq!(report.display_name(), "router");
}

#[tokio::test]
async fn test_audit_keeps_outputs_before_failure() {
    let mock = MockTransport::privileged();
    mock.fail_on("show inventory");

    let report = Auditor::new(mock.shared())
        .run(
            &device("r1"),
            &commands(&["show version", "show inventory", "show clock"]),
        )
        .await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].command, "show version");
    match &report.error {
        Some(Error::Command { command, .. }) => assert_eq!(command, "show inventory"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(report.connected());
    assert!(!mock.commands_to("r1").iter().any(|c| c == "show clock"));
    assert_eq!(mock.close_count(), 1);
}

#[tokio::test]
async fn test_audit_connect_failure() {
    let mock = MockTransport::privileged();
    mock.fail_open("r1", OpenFailure::Timeout);

    let report = Auditor::new(mock.shared())
        .run(&device("r1"), &commands(&["show version"]))
        .await;

    assert!(report.results.is_empty());
    assert!(!report.connected());
    assert!(matches!(report.error, Some(Error::ConnectionTimeout { .. })));
    assert_eq!(mock.close_count(), 0);
}

#[tokio::test]
async fn test_audit_elevation_denied() {
    let mock = MockTransport::user_mode();
    let dev = device("r1").with_enable_secret("wrong");

    let report = Auditor::new(mock.shared())
        .run(&dev, &commands(&["show running-config"]))
        .await;

    let error = report.error.as_ref().expect("elevation must fail");
    assert_eq!(error.stage(), Some(Stage::Elevate));
    assert!(report.results.is_empty());
    assert!(!mock
        .commands_to("r1")
        .iter()
        .any(|c| c == "show running-config"));
    assert_eq!(mock.close_count(), 1);
}

#[tokio::test]
async fn test_empty_command_list() {
    let mock = MockTransport::privileged();
    let report = Auditor::new(mock.shared()).run(&device("r1"), &[]).await;

    assert!(report.is_success());
    assert!(report.results.is_empty());
    assert_eq!(mock.close_count(), 1);
}

#[tokio::test]
async fn test_audit_log_appends_runs() {
    let dir = TempDir::new().unwrap();
    let mock = MockTransport::privileged();
    let auditor = Auditor::new(mock.shared());
    let writer = AuditLogWriter::new(dir.path()).with_prefix("lab");
    let list = commands(&["show version", "show clock"]);

    let first = auditor.run(&device_with_secret("r1"), &list).await;
    let path = writer.write(&first).unwrap();
    let second = auditor.run(&device_with_secret("r1"), &list).await;
    let again = writer.write(&second).unwrap();

    assert_eq!(path, again);
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("lab_r1_"));
    assert!(name.ends_with(".log"));

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches(" ### ").count(), 2);
    assert!(content.contains("router ###\r\n"));
    let version = content.find("output of show version").unwrap();
    let clock = content.find("output of show clock").unwrap();
    assert!(version < clock);
}

#[tokio::test]
async fn test_audit_log_creates_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("audits").join("2015");
    let mock = MockTransport::privileged();

    let report = Auditor::new(mock.shared())
        .run(&device("10.255.138.120"), &commands(&["show version"]))
        .await;
    let path = AuditLogWriter::new(&nested).write(&report).unwrap();

    assert!(path.starts_with(&nested));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with(" ### "));
    assert!(content.contains("10.255.138.120 ###"));
}
