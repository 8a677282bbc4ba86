//! Audit sequence: run read-only commands and capture their output.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::device::DeviceDescriptor;
use super::privilege;
use super::response::ResponseClassifier;
use super::{serialize_error, Stage};
use crate::connection::{CliSession, CliTransport};
use crate::error::{Error, Result};

/// A command paired with the raw text the device returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Command as sent
    pub command: String,
    /// Device response, verbatim
    pub output: String,
}

/// Outcome of an audit run against one device.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    /// Target host
    pub host: String,
    /// Hostname from the device prompt, when it was probed
    pub hostname: Option<String>,
    /// Captured outputs in command order
    pub results: Vec<CommandOutput>,
    /// Error that stopped the run, if any
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Error>,
    /// When the run started
    pub started_at: DateTime<Local>,
    /// When the run finished
    pub finished_at: DateTime<Local>,
}

impl AuditReport {
    fn new(host: &str) -> Self {
        let now = Local::now();
        Self {
            host: host.to_string(),
            hostname: None,
            results: Vec::new(),
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// A report for a run that never started.
    pub fn failed(host: &str, error: Error) -> Self {
        let mut report = Self::new(host);
        report.error = Some(error);
        report
    }

    /// Returns true if every command ran.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the session was opened.
    pub fn connected(&self) -> bool {
        !self.error.as_ref().is_some_and(Error::is_unreachable)
    }

    /// Hostname for display: the prompt hostname, else the host.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.host)
    }
}

/// Runs an ordered list of commands on a device.
///
/// The list is assumed read-only; nothing is validated.
pub struct Auditor {
    transport: Arc<dyn CliTransport>,
    classifier: Arc<ResponseClassifier>,
}

impl Auditor {
    /// Create an auditor with the default response patterns.
    pub fn new(transport: Arc<dyn CliTransport>) -> Self {
        Self {
            transport,
            classifier: Arc::new(ResponseClassifier::default()),
        }
    }

    /// Use a custom classifier for the enable exchange.
    pub fn with_classifier(mut self, classifier: Arc<ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run `commands` in order and collect their outputs.
    ///
    /// Connection and elevation failures yield a report without results. A
    /// failure while sending a command stops the run; outputs captured before
    /// it are kept.
    pub async fn run(&self, device: &DeviceDescriptor, commands: &[String]) -> AuditReport {
        let host = device.host.as_str();
        let mut report = AuditReport::new(host);

        info!(host = %host, commands = commands.len(), "Starting audit");

        let mut session = match self.transport.open(device).await {
            Ok(session) => session,
            Err(e) => {
                let error = Error::from_connect(host, device.username(), e);
                warn!(host = %host, stage = %Stage::Connect, error = %error, "Audit failed");
                report.error = Some(error);
                report.finished_at = Local::now();
                return report;
            }
        };

        if let Err(error) = self.drive(session.as_mut(), device, commands, &mut report).await {
            warn!(host = %host, stage = ?error.stage(), error = %error, "Audit stopped");
            report.error = Some(error);
        }

        if let Err(e) = session.close().await {
            warn!(host = %host, error = %e, "Failed to close session");
        }

        report.finished_at = Local::now();
        info!(
            host = %host,
            captured = report.results.len(),
            success = report.is_success(),
            "Audit finished"
        );
        report
    }

    async fn drive(
        &self,
        session: &mut dyn CliSession,
        device: &DeviceDescriptor,
        commands: &[String],
        report: &mut AuditReport,
    ) -> Result<()> {
        let host = device.host.as_str();

        if let Some(secret) = device.enable_secret.as_deref() {
            let probe = privilege::probe(session, host).await?;
            report.hostname = probe.hostname();
            if !probe.privileged() {
                privilege::enable(session, host, secret, &self.classifier).await?;
            }
        }

        for command in commands {
            debug!(host = %host, command = %command, "Sending command");
            let output = session.send(command).await.map_err(|e| Error::Command {
                host: host.to_string(),
                command: command.clone(),
                message: e.to_string(),
            })?;
            report.results.push(CommandOutput {
                command: command.clone(),
                output,
            });
        }

        Ok(())
    }
}
