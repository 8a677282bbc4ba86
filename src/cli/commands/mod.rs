//! Subcommands module for iosctl CLI
//!
//! This module contains all the subcommand implementations.

pub mod install;
pub mod show;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::cli::output::{HostStatus, OutputFormatter};
use crate::cli::{Cli, TargetArgs};
use iosctl::config::Config;
use iosctl::connection::CliTransport;
use iosctl::executor::BatchRunner;
use iosctl::network::{DeviceDescriptor, ResponseClassifier};
use iosctl::Error;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration, with command-line overrides applied
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Verbosity level
    pub verbosity: u8,
    /// Session factory shared by all device tasks
    pub transport: Arc<dyn CliTransport>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config, transport: Arc<dyn CliTransport>) -> Self {
        let output = OutputFormatter::new(config.colors.is_enabled(), cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            verbosity: cli.verbosity(),
            transport,
        }
    }

    /// Batch runner sized by the configured forks
    pub fn runner(&self) -> BatchRunner {
        BatchRunner::new(self.config.defaults.forks)
    }

    /// Compiled response classifier
    pub fn classifier(&self) -> Result<Arc<ResponseClassifier>> {
        let classifier = self
            .config
            .classifier()
            .context("Invalid response pattern in configuration")?;
        Ok(Arc::new(classifier))
    }

    /// Build one descriptor per target host.
    pub fn devices(&self, target: &TargetArgs) -> Result<Vec<DeviceDescriptor>> {
        let user = target
            .user
            .clone()
            .or_else(|| self.config.remote_user().map(String::from))
            .context("No username given; pass --user or set defaults.remote_user")?;

        Ok(target
            .hosts
            .iter()
            .map(|host| {
                let mut device = DeviceDescriptor::new(host.clone(), user.clone())
                    .with_port(self.config.defaults.port);
                if let Some(password) = &target.password {
                    device = device.with_password(password.clone());
                }
                if let Some(secret) = &target.enable_secret {
                    device = device.with_enable_secret(secret.clone());
                }
                if let Some(key) = &self.config.ssh.private_key_file {
                    device = device.with_private_key(key.clone());
                }
                device
            })
            .collect())
    }
}

/// Host status for a run that stopped with `error`.
pub(crate) fn failure_status(error: &Error) -> HostStatus {
    if error.is_unreachable() {
        HostStatus::Unreachable
    } else {
        HostStatus::Failed
    }
}
