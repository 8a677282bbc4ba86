//! Show command - run read-only commands and write audit logs

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{failure_status, CommandContext};
use crate::cli::output::{HostStatus, RecapStats};
use crate::cli::TargetArgs;
use iosctl::network::{AuditLogWriter, AuditReport, Auditor};

/// Arguments for the show command
#[derive(Parser, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["commands", "commands_file"])
))]
pub struct ShowArgs {
    /// Target devices and credentials
    #[command(flatten)]
    pub target: TargetArgs,

    /// Command to run (repeatable, run in order)
    #[arg(long = "command", short = 'C')]
    pub commands: Vec<String>,

    /// File of commands: a YAML list, or one command per line
    #[arg(long)]
    pub commands_file: Option<PathBuf>,

    /// Directory audit logs are written to
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Audit log file name prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Serialize)]
struct HostEntry<'a> {
    status: HostStatus,
    log_file: Option<PathBuf>,
    #[serde(flatten)]
    report: &'a AuditReport,
}

impl ShowArgs {
    /// Execute the show command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let commands = match &self.commands_file {
            Some(path) => load_commands(path)?,
            None => self.commands.clone(),
        };
        if commands.is_empty() {
            anyhow::bail!("No commands to run");
        }

        let devices = ctx.devices(&self.target)?;
        let writer = AuditLogWriter::new(
            self.dest
                .clone()
                .unwrap_or_else(|| ctx.config.defaults.audit_dir.clone()),
        )
        .with_prefix(
            self.prefix
                .clone()
                .unwrap_or_else(|| ctx.config.defaults.audit_prefix.clone()),
        );

        ctx.output.banner(&format!(
            "SHOW [{} command(s) on {} device(s)]",
            commands.len(),
            devices.len()
        ));

        let auditor = Arc::new(Auditor::new(Arc::clone(&ctx.transport)).with_classifier(ctx.classifier()?));
        let reports = ctx
            .runner()
            .run_audit(auditor, devices, Arc::new(commands))
            .await;

        let mut recap = RecapStats::new();
        let mut entries = Vec::with_capacity(reports.len());

        for report in &reports {
            let log_file = if report.connected() {
                match writer.write(report) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        ctx.output.warning(&format!(
                            "Could not write audit log for {}: {}",
                            report.host, e
                        ));
                        None
                    }
                }
            } else {
                None
            };

            let status = match &report.error {
                None => HostStatus::Ok,
                Some(error) => failure_status(error),
            };
            recap.record(&report.host, status);

            let message = match (&report.error, &log_file) {
                (Some(error), _) => Some(error.to_string()),
                (None, Some(path)) => Some(path.display().to_string()),
                (None, None) => None,
            };
            ctx.output.host_result(&report.host, status, message.as_deref());
            for result in &report.results {
                ctx.output.device_text(&result.command, &result.output);
            }

            entries.push(HostEntry {
                status,
                log_file,
                report,
            });
        }

        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "command": "show",
                "hosts": entries,
                "recap": recap,
            }))?;
        } else {
            ctx.output.recap(&recap);
        }
        ctx.output.flush();

        Ok(recap.exit_code())
    }
}

/// Read commands from a file: YAML for `.yml`/`.yaml`, otherwise one per line.
pub fn load_commands(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read commands file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Commands file must be a YAML list: {}", path.display())),
        _ => Ok(parse_command_lines(&content)),
    }
}

/// One command per line; blank lines and `#` comments are skipped.
pub fn parse_command_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
