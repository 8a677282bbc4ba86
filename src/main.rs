//! iosctl - audit and configure Cisco IOS devices over SSH
//!
//! This is the main entry point for the iosctl CLI.

mod cli;

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::commands::CommandContext;
use cli::{Cli, Commands};
use iosctl::config::Config;
use iosctl::connection::{RusshTransport, SessionConfig};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    init_logging(
        cli.verbosity(),
        config.logging.log_path.as_deref(),
        &config.logging.log_level,
    )?;
    tracing::debug!(version = VERSION, forks = config.defaults.forks, "iosctl starting");

    let transport = Arc::new(RusshTransport::new(SessionConfig::from(&config)));
    let mut ctx = CommandContext::new(cli, config, transport);

    match &cli.command {
        Commands::Show(args) => args.execute(&mut ctx).await,
        Commands::Install(args) => args.execute(&mut ctx).await,
    }
}

/// Initialize logging based on verbosity level, with an optional debug log file
fn init_logging(verbosity: u8, log_path: Option<&Path>, file_level: &str) -> Result<()> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 3)
        .with_filter(env_filter);

    let file_layer = match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(file_level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
