//! Install sequence: back up, apply a configuration from a URL, persist.
//!
//! The sequence is a linear state machine:
//!
//! ```text
//! Connected -> [Privileged] -> BackedUp -> Configured -> Saved -> Disconnected
//! ```
//!
//! The configure step is never issued unless the backup completed, and the
//! session is closed exactly once on every path after a successful connect.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::device::DeviceDescriptor;
use super::privilege;
use super::response::{awaiting_confirmation, Response, ResponseClassifier};
use super::Stage;
use crate::connection::{CliSession, CliTransport, ConnectionResult};
use crate::error::{Error, Result};

/// Default device filesystem for backups
pub const DEFAULT_BACKUP_FILESYSTEM: &str = "nvram:";

/// Upper bound on confirmation questions answered for one copy
const MAX_CONFIRMATIONS: usize = 4;

/// A configuration source URL handed to the device's copy command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigUrl(String);

impl ConfigUrl {
    /// Validate a URL: non-empty and free of whitespace.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidConfig {
                key: "url".to_string(),
                message: "configuration URL must not be empty".to_string(),
            });
        }
        if url.chars().any(char::is_whitespace) {
            return Err(Error::InvalidConfig {
                key: "url".to_string(),
                message: format!("configuration URL '{}' contains whitespace", url),
            });
        }
        Ok(Self(url.to_string()))
    }

    /// The URL text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a caller-supplied backup file name: non-empty, free of
/// whitespace, and not a bare `fs:` prefix.
pub fn check_backup_name(name: &str) -> Result<()> {
    let invalid = |message: String| Error::InvalidConfig {
        key: "backup_name".to_string(),
        message,
    };
    if name.trim().is_empty() {
        return Err(invalid("backup name must not be empty".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid(format!("backup name '{}' contains whitespace", name)));
    }
    if name.ends_with(':') {
        return Err(invalid(format!("backup name '{}' has no file name", name)));
    }
    Ok(())
}

/// Build the device path the running configuration is backed up to.
///
/// A caller-supplied name carrying its own `fs:` prefix is used verbatim;
/// any other name is placed on `filesystem`. Without a name the file is
/// `<hostname>_<md5 of the timestamp>.cfg`.
pub fn backup_destination(
    filesystem: &str,
    hostname: &str,
    name: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let mut filesystem = filesystem.to_string();
    if !filesystem.contains(':') {
        filesystem.push(':');
    }

    match name {
        Some(name) if name.contains(':') => name.to_string(),
        Some(name) => format!("{}{}", filesystem, name),
        None => {
            let stamp = now.format("%a %b %e %H:%M:%S %Y").to_string();
            let digest = md5::compute(stamp.as_bytes());
            format!("{}{}_{:x}.cfg", filesystem, hostname, digest)
        }
    }
}

/// How far an install got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallState {
    /// Nothing happened yet
    Pending,
    /// Session open
    Connected,
    /// Privileged EXEC mode confirmed
    Privileged,
    /// Running configuration saved to device storage
    BackedUp,
    /// New configuration applied to running-config
    Configured,
    /// Running configuration saved to startup-config
    Saved,
}

/// One command sent by the installer and the device text it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step the command belongs to
    pub stage: Stage,
    /// Command as sent
    pub command: String,
    /// Device response, including answered confirmations
    pub output: String,
}

/// Record of an install run against one device.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Target host
    pub host: String,
    /// Hostname from the device prompt
    pub hostname: Option<String>,
    /// Configuration source
    pub url: ConfigUrl,
    /// Where the running configuration was backed up to
    pub backup_destination: Option<String>,
    /// Furthest state reached
    pub state: InstallState,
    /// Whether the session was closed cleanly
    pub closed: bool,
    /// Commands sent, in order
    pub steps: Vec<StepRecord>,
    /// When the run started
    pub started_at: DateTime<Local>,
    /// When the run finished
    pub finished_at: Option<DateTime<Local>>,
}

impl InstallReport {
    fn new(host: &str, url: &ConfigUrl) -> Self {
        Self {
            host: host.to_string(),
            hostname: None,
            url: url.clone(),
            backup_destination: None,
            state: InstallState::Pending,
            closed: false,
            steps: Vec::new(),
            started_at: Local::now(),
            finished_at: None,
        }
    }

    /// True once the device accepted the new configuration.
    pub fn changed(&self) -> bool {
        self.state >= InstallState::Configured
    }

    /// Commands sent, in order
    pub fn commands(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.command.as_str()).collect()
    }

    fn record(&mut self, stage: Stage, command: &str, output: &str) {
        self.steps.push(StepRecord {
            stage,
            command: command.to_string(),
            output: output.to_string(),
        });
    }
}

/// A failed install: the error and everything captured up to it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct InstallFailure {
    /// What went wrong
    pub error: Error,
    /// Partial report
    pub report: InstallReport,
}

impl InstallFailure {
    /// A failure raised outside the sequence itself, before anything was sent.
    pub fn aborted(host: &str, url: &ConfigUrl, error: Error) -> Self {
        let mut report = InstallReport::new(host, url);
        report.finished_at = Some(Local::now());
        Self { error, report }
    }

    /// Returns true if the device was left running an unsaved configuration.
    pub fn changed(&self) -> bool {
        self.report.changed()
    }
}

/// Applies a configuration from a URL to a device, guarded by a backup.
pub struct Installer {
    transport: Arc<dyn CliTransport>,
    classifier: Arc<ResponseClassifier>,
    backup_filesystem: String,
}

impl Installer {
    /// Create an installer with default patterns and the `nvram:` backup filesystem.
    pub fn new(transport: Arc<dyn CliTransport>) -> Self {
        Self {
            transport,
            classifier: Arc::new(ResponseClassifier::default()),
            backup_filesystem: DEFAULT_BACKUP_FILESYSTEM.to_string(),
        }
    }

    /// Use a custom response classifier.
    pub fn with_classifier(mut self, classifier: Arc<ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Store backups on another device filesystem (`flash:`, `bootflash:`).
    pub fn with_backup_filesystem(mut self, filesystem: impl Into<String>) -> Self {
        self.backup_filesystem = filesystem.into();
        self
    }

    /// Run the install sequence against one device.
    pub async fn run(
        &self,
        device: &DeviceDescriptor,
        url: &ConfigUrl,
        backup_name: Option<&str>,
    ) -> std::result::Result<InstallReport, InstallFailure> {
        let host = device.host.as_str();
        let mut report = InstallReport::new(host, url);

        if let Some(Err(error)) = backup_name.map(check_backup_name) {
            report.finished_at = Some(Local::now());
            return Err(InstallFailure { error, report });
        }

        info!(host = %host, url = %url, "Starting install");

        let mut session = match self.transport.open(device).await {
            Ok(session) => session,
            Err(e) => {
                let error = Error::from_connect(host, device.username(), e);
                warn!(host = %host, stage = %Stage::Connect, error = %error, "Install failed");
                report.finished_at = Some(Local::now());
                return Err(InstallFailure { error, report });
            }
        };
        report.state = InstallState::Connected;

        let result = self
            .drive(session.as_mut(), device, url, backup_name, &mut report)
            .await;

        match session.close().await {
            Ok(()) => report.closed = true,
            Err(e) => warn!(host = %host, stage = %Stage::Disconnect, error = %e, "Failed to close session"),
        }
        report.finished_at = Some(Local::now());

        match result {
            Ok(()) => {
                info!(host = %host, "Install complete");
                Ok(report)
            }
            Err(error) => {
                warn!(
                    host = %host,
                    stage = ?error.stage(),
                    changed = report.changed(),
                    error = %error,
                    "Install failed"
                );
                Err(InstallFailure { error, report })
            }
        }
    }

    async fn drive(
        &self,
        session: &mut dyn CliSession,
        device: &DeviceDescriptor,
        url: &ConfigUrl,
        backup_name: Option<&str>,
        report: &mut InstallReport,
    ) -> Result<()> {
        let host = device.host.as_str();

        // Probe
        let probe = privilege::probe(session, host).await?;
        report.record(Stage::Probe, "", &probe.output);
        report.hostname = probe.hostname();

        // Elevate
        if !probe.privileged() {
            let secret = device.enable_secret.as_deref().ok_or_else(|| {
                Error::privilege(
                    host,
                    "session is in user EXEC mode and no enable secret was supplied",
                    probe.output.clone(),
                )
            })?;
            let output = privilege::enable(session, host, secret, &self.classifier).await?;
            report.record(Stage::Elevate, "enable", &output);
        }
        report.state = InstallState::Privileged;

        // Backup
        let hostname = report.hostname.clone().unwrap_or_else(|| host.to_string());
        let destination =
            backup_destination(&self.backup_filesystem, &hostname, backup_name, Local::now());
        report.backup_destination = Some(destination.clone());
        info!(host = %host, stage = %Stage::Backup, destination = %destination, "Backing up running-config");

        let command = format!("copy running-config {}", destination);
        let output = self
            .copy(session, &command)
            .await
            .map_err(|e| Error::backup(host, &destination, e.to_string(), ""))?;
        report.record(Stage::Backup, &command, &output);
        if let Response::DeviceError(message) = self.classifier.classify_copy(&output) {
            return Err(Error::backup(host, &destination, message, output));
        }
        report.state = InstallState::BackedUp;

        // Configure
        info!(host = %host, stage = %Stage::Configure, url = %url, "Applying configuration");
        let command = format!("copy {} running-config", url);
        let output = self
            .copy(session, &command)
            .await
            .map_err(|e| Error::configure(host, url.as_str(), e.to_string(), ""))?;
        report.record(Stage::Configure, &command, &output);
        if let Response::DeviceError(message) = self.classifier.classify_configure(&output) {
            return Err(Error::configure(host, url.as_str(), message, output));
        }
        report.state = InstallState::Configured;

        // Persist
        info!(host = %host, stage = %Stage::Persist, "Saving running-config to startup-config");
        let command = "copy running-config startup-config";
        let output = self
            .copy(session, command)
            .await
            .map_err(|e| Error::persist(host, e.to_string(), ""))?;
        report.record(Stage::Persist, command, &output);
        if let Response::DeviceError(message) = self.classifier.classify_copy(&output) {
            return Err(Error::persist(host, message, output));
        }
        report.state = InstallState::Saved;

        Ok(())
    }

    /// Send a copy command and answer its confirmation questions with a bare newline.
    async fn copy(&self, session: &mut dyn CliSession, command: &str) -> ConnectionResult<String> {
        let mut output = session.send(command).await?;
        let mut answered = 0;
        while awaiting_confirmation(&output) && answered < MAX_CONFIRMATIONS {
            debug!(command = %command, "Confirming copy prompt");
            output.push_str(&session.send("").await?);
            answered += 1;
        }
        Ok(output)
    }
}
