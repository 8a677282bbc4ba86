//! CLI module for iosctl
//!
//! Argument parsing and subcommand dispatch for the `iosctl` binary.

pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use iosctl::config::Config;

/// iosctl - audit and configure Cisco IOS devices over SSH
#[derive(Parser, Debug, Clone)]
#[command(name = "iosctl")]
#[command(author = "iosctl Contributors")]
#[command(version)]
#[command(about = "Audit and configure Cisco IOS devices over SSH", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Number of devices handled at once
    #[arg(short = 'f', long, global = true)]
    pub forks: Option<usize>,

    /// SSH port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Per-command timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "IOSCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write a debug log to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Private key tried before the password
    #[arg(long, global = true)]
    pub private_key: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// One JSON document for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run show commands and write their output to audit logs
    Show(commands::show::ShowArgs),

    /// Back up, apply a configuration from a URL, and save it
    Install(commands::install::InstallArgs),
}

/// Devices and credentials shared by all subcommands
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Device address or hostname (repeatable)
    #[arg(long = "host", short = 'H', required = true, num_args = 1..)]
    pub hosts: Vec<String>,

    /// Login username
    #[arg(short = 'u', long = "user", env = "IOSCTL_USER")]
    pub user: Option<String>,

    /// Login password
    #[arg(short = 'p', long, env = "IOSCTL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable secret for privileged EXEC mode
    #[arg(long, env = "IOSCTL_ENABLE_SECRET", hide_env_values = true)]
    pub enable_secret: Option<String>,
}

impl Cli {
    /// Parse command-line arguments; usage errors exit with status 1
    pub fn parse_args() -> Self {
        Cli::try_parse().unwrap_or_else(|e| {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        })
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(forks) = self.forks {
            config.defaults.forks = forks.max(1);
        }
        if let Some(port) = self.port {
            config.defaults.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.ssh.command_timeout = timeout.max(1);
        }
        if let Some(key) = &self.private_key {
            config.ssh.private_key_file = Some(key.clone());
        }
        if let Some(path) = &self.log_file {
            config.logging.log_path = Some(path.clone());
        }
        if self.no_color {
            config.colors.enabled = Some(false);
        }
    }
}
