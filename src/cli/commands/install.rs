//! Install command - apply a configuration from a URL, guarded by a backup

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;

use super::{failure_status, CommandContext};
use crate::cli::output::{HostStatus, RecapStats};
use crate::cli::TargetArgs;
use iosctl::network::{check_backup_name, ConfigUrl, InstallReport, Installer, Stage};

/// Arguments for the install command
#[derive(Parser, Debug, Clone)]
pub struct InstallArgs {
    /// Target devices and credentials
    #[command(flatten)]
    pub target: TargetArgs,

    /// URL the device copies the configuration from (ftp://, tftp://, ...)
    #[arg(long)]
    pub url: String,

    /// Backup file name (default: <hostname>_<md5>.cfg on the backup filesystem)
    #[arg(long)]
    pub backup_name: Option<String>,
}

#[derive(Serialize)]
struct HostEntry<'a> {
    status: HostStatus,
    changed: bool,
    error: Option<String>,
    failed_stage: Option<Stage>,
    #[serde(flatten)]
    report: &'a InstallReport,
}

impl InstallArgs {
    /// Execute the install command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let url = ConfigUrl::parse(&self.url)?;
        if let Some(name) = &self.backup_name {
            check_backup_name(name)?;
        }
        let devices = ctx.devices(&self.target)?;

        ctx.output.banner(&format!(
            "INSTALL [{} on {} device(s)]",
            url,
            devices.len()
        ));

        let installer = Arc::new(
            Installer::new(Arc::clone(&ctx.transport))
                .with_classifier(ctx.classifier()?)
                .with_backup_filesystem(ctx.config.device.backup_filesystem.clone()),
        );
        let outcomes = ctx
            .runner()
            .run_install(installer, devices, url, self.backup_name.clone())
            .await;

        let mut recap = RecapStats::new();
        let mut entries = Vec::with_capacity(outcomes.len());

        for outcome in &outcomes {
            let entry = match outcome {
                Ok(report) => {
                    let message = report
                        .backup_destination
                        .as_ref()
                        .map(|dest| format!("backup saved to {}", dest));
                    ctx.output
                        .host_result(&report.host, HostStatus::Changed, message.as_deref());
                    HostEntry {
                        status: HostStatus::Changed,
                        changed: true,
                        error: None,
                        failed_stage: None,
                        report,
                    }
                }
                Err(failure) => {
                    let status = failure_status(&failure.error);
                    ctx.output
                        .host_result(&failure.report.host, status, Some(&failure.error.to_string()));
                    if failure.changed() {
                        ctx.output.warning(&format!(
                            "{} is running the new configuration but it was not saved to startup-config",
                            failure.report.host
                        ));
                    }
                    if let Some(text) = failure.error.device_output() {
                        ctx.output.device_text("device output", text);
                    }
                    HostEntry {
                        status,
                        changed: failure.changed(),
                        error: Some(failure.error.to_string()),
                        failed_stage: failure.error.stage(),
                        report: &failure.report,
                    }
                }
            };
            recap.record(&entry.report.host, entry.status);
            entries.push(entry);
        }

        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "command": "install",
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
