//! Session configuration module
//!
//! Timeouts, terminal geometry and host key settings for interactive device
//! sessions. Built from the `[ssh]` section of the application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Default TCP connect and SSH handshake timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 4;

/// Default time to wait for a prompt after sending a command, in seconds
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 60;

/// Default quiet period used when draining login banners, in milliseconds
pub const DEFAULT_SETTLE_MS: u64 = 1500;

/// Terminal width requested from the device
pub const DEFAULT_TERMINAL_WIDTH: u32 = 512;

/// Terminal length requested from the device (0 disables paging)
pub const DEFAULT_TERMINAL_LENGTH: u32 = 0;

/// Settings shared by every session a transport opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// TCP connect and SSH handshake timeout (seconds)
    pub connect_timeout: u64,
    /// Maximum wait for a prompt after each command (seconds)
    pub command_timeout: u64,
    /// Quiet period that ends banner draining (milliseconds)
    pub settle_ms: u64,
    /// `terminal width` sent after login
    pub terminal_width: u32,
    /// `terminal length` sent after login
    pub terminal_length: u32,
    /// Accept hosts missing from known_hosts
    pub accept_unknown_hosts: bool,
    /// known_hosts file (default: ~/.ssh/known_hosts)
    pub known_hosts_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            settle_ms: DEFAULT_SETTLE_MS,
            terminal_width: DEFAULT_TERMINAL_WIDTH,
            terminal_length: DEFAULT_TERMINAL_LENGTH,
            accept_unknown_hosts: true,
            known_hosts_file: None,
        }
    }
}

impl SessionConfig {
    /// Connect timeout as a duration
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Command timeout as a duration
    pub fn command_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }

    /// Settle window as a duration
    pub fn settle_duration(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Path of the known_hosts file to consult
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        match &self.known_hosts_file {
            Some(path) => Some(expand_path(&path.to_string_lossy())),
            None => dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts")),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: config.ssh.connect_timeout,
            command_timeout: config.ssh.command_timeout,
            settle_ms: config.ssh.settle_ms,
            terminal_width: config.ssh.terminal_width,
            terminal_length: config.ssh.terminal_length,
            accept_unknown_hosts: config.ssh.accepts_unknown_hosts(),
            known_hosts_file: config.ssh.known_hosts_file.clone(),
        }
    }
}

/// Expand ~ and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or_else(|_| path.into());
    PathBuf::from(expanded.as_ref())
}
