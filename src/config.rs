//! Configuration module for iosctl
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/iosctl/iosctl.toml)
//! - User configuration (~/.iosctl.toml)
//! - Project configuration (./iosctl.toml)
//! - Environment variables
//! - Command-line arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::connection::config::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SETTLE_MS, DEFAULT_TERMINAL_LENGTH,
    DEFAULT_TERMINAL_WIDTH,
};
use crate::network::audit_log::DEFAULT_AUDIT_PREFIX;
use crate::network::install::DEFAULT_BACKUP_FILESYSTEM;
use crate::network::{ResponseClassifier, ResponsePatterns, DEFAULT_SSH_PORT};

/// Default number of devices handled at once
pub const DEFAULT_FORKS: usize = 5;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// SSH session settings
    pub ssh: SshConfig,

    /// Device behavior settings
    pub device: DeviceConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// Default configuration values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Defaults {
    /// Maximum devices processed concurrently
    pub forks: usize,

    /// SSH port
    pub port: u16,

    /// Login user when none is given on the command line
    pub remote_user: Option<String>,

    /// Directory audit logs are written to
    pub audit_dir: PathBuf,

    /// Audit log file name prefix
    pub audit_prefix: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            forks: DEFAULT_FORKS,
            port: DEFAULT_SSH_PORT,
            remote_user: None,
            audit_dir: PathBuf::from("."),
            audit_prefix: DEFAULT_AUDIT_PREFIX.to_string(),
        }
    }
}

/// SSH settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    /// Connect timeout in seconds
    pub connect_timeout: u64,

    /// Per-command timeout in seconds
    pub command_timeout: u64,

    /// Banner settle window in milliseconds
    pub settle_ms: u64,

    /// `terminal width` sent after login
    pub terminal_width: u32,

    /// `terminal length` sent after login
    pub terminal_length: u32,

    /// Accept hosts missing from known_hosts (unset: accept)
    pub accept_unknown_hosts: Option<bool>,

    /// known_hosts file
    pub known_hosts_file: Option<PathBuf>,

    /// Private key tried before the password
    pub private_key_file: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            settle_ms: DEFAULT_SETTLE_MS,
            terminal_width: DEFAULT_TERMINAL_WIDTH,
            terminal_length: DEFAULT_TERMINAL_LENGTH,
            accept_unknown_hosts: None,
            known_hosts_file: None,
            private_key_file: None,
        }
    }
}

impl SshConfig {
    /// Whether hosts missing from known_hosts are accepted
    pub fn accepts_unknown_hosts(&self) -> bool {
        self.accept_unknown_hosts.unwrap_or(true)
    }
}

/// Device behavior settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Filesystem backups are written to
    pub backup_filesystem: String,

    /// Response classification patterns
    pub patterns: ResponsePatterns,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backup_filesystem: DEFAULT_BACKUP_FILESYSTEM.to_string(),
            patterns: ResponsePatterns::default(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Debug log file
    pub log_path: Option<PathBuf>,

    /// Log level used for the log file
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: "debug".to_string(),
        }
    }
}

/// Colors configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors (unset: enabled)
    pub enabled: Option<bool>,
}

impl ColorsConfig {
    /// Whether colored output is on
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            } else if config_path == Some(&path) {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        if let Ok(env_config) = std::env::var("IOSCTL_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("/etc/iosctl/iosctl.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".iosctl.toml"));
        }
        paths.push(PathBuf::from("iosctl.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values that differ from the
    /// defaults in `other` win.
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();

        fn pick<T: PartialEq + Clone>(mine: &T, theirs: T, default: &T) -> T {
            if &theirs != default {
                theirs
            } else {
                mine.clone()
            }
        }

        Config {
            defaults: Defaults {
                forks: pick(&self.defaults.forks, other.defaults.forks, &defaults.defaults.forks),
                port: pick(&self.defaults.port, other.defaults.port, &defaults.defaults.port),
                remote_user: other
                    .defaults
                    .remote_user
                    .or_else(|| self.defaults.remote_user.clone()),
                audit_dir: pick(
                    &self.defaults.audit_dir,
                    other.defaults.audit_dir,
                    &defaults.defaults.audit_dir,
                ),
                audit_prefix: pick(
                    &self.defaults.audit_prefix,
                    other.defaults.audit_prefix,
                    &defaults.defaults.audit_prefix,
                ),
            },
            ssh: SshConfig {
                connect_timeout: pick(
                    &self.ssh.connect_timeout,
                    other.ssh.connect_timeout,
                    &defaults.ssh.connect_timeout,
                ),
                command_timeout: pick(
                    &self.ssh.command_timeout,
                    other.ssh.command_timeout,
                    &defaults.ssh.command_timeout,
                ),
                settle_ms: pick(&self.ssh.settle_ms, other.ssh.settle_ms, &defaults.ssh.settle_ms),
                terminal_width: pick(
                    &self.ssh.terminal_width,
                    other.ssh.terminal_width,
                    &defaults.ssh.terminal_width,
                ),
                terminal_length: pick(
                    &self.ssh.terminal_length,
                    other.ssh.terminal_length,
                    &defaults.ssh.terminal_length,
                ),
                accept_unknown_hosts: other
                    .ssh
                    .accept_unknown_hosts
                    .or(self.ssh.accept_unknown_hosts),
                known_hosts_file: other
                    .ssh
                    .known_hosts_file
                    .or_else(|| self.ssh.known_hosts_file.clone()),
                private_key_file: other
                    .ssh
                    .private_key_file
                    .or_else(|| self.ssh.private_key_file.clone()),
            },
            device: DeviceConfig {
                backup_filesystem: pick(
                    &self.device.backup_filesystem,
                    other.device.backup_filesystem,
                    &defaults.device.backup_filesystem,
                ),
                patterns: pick(
                    &self.device.patterns,
                    other.device.patterns,
                    &defaults.device.patterns,
                ),
            },
            logging: LoggingConfig {
                log_path: other
                    .logging
                    .log_path
                    .or_else(|| self.logging.log_path.clone()),
                log_level: pick(
                    &self.logging.log_level,
                    other.logging.log_level,
                    &defaults.logging.log_level,
                ),
            },
            colors: ColorsConfig {
                enabled: other.colors.enabled.or(self.colors.enabled),
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // IOSCTL_FORKS
        if let Ok(forks) = std::env::var("IOSCTL_FORKS") {
            if let Ok(n) = forks.parse() {
                self.defaults.forks = n;
            }
        }

        // IOSCTL_TIMEOUT
        if let Ok(timeout) = std::env::var("IOSCTL_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.ssh.command_timeout = n;
            }
        }

        // IOSCTL_USER
        if let Ok(user) = std::env::var("IOSCTL_USER") {
            self.defaults.remote_user = Some(user);
        }

        // IOSCTL_PRIVATE_KEY_FILE
        if let Ok(file) = std::env::var("IOSCTL_PRIVATE_KEY_FILE") {
            self.ssh.private_key_file = Some(PathBuf::from(file));
        }

        // IOSCTL_LOG_PATH
        if let Ok(path) = std::env::var("IOSCTL_LOG_PATH") {
            self.logging.log_path = Some(PathBuf::from(path));
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("IOSCTL_NO_COLOR").is_ok() {
            self.colors.enabled = Some(false);
        }
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<()> {
        if self.defaults.forks == 0 {
            anyhow::bail!("defaults.forks must be at least 1");
        }
        if self.ssh.connect_timeout == 0 || self.ssh.command_timeout == 0 {
            anyhow::bail!("ssh timeouts must be at least 1 second");
        }
        if self.device.backup_filesystem.trim().is_empty() {
            anyhow::bail!("device.backup_filesystem must not be empty");
        }
        self.classifier()
            .context("Invalid pattern in [device.patterns]")?;
        Ok(())
    }

    /// Compile the configured response patterns.
    pub fn classifier(&self) -> crate::error::Result<ResponseClassifier> {
        ResponseClassifier::new(&self.device.patterns)
    }

    /// Get the effective remote user
    pub fn remote_user(&self) -> Option<&str> {
        self.defaults.remote_user.as_deref()
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.forks, 5);
        assert_eq!(config.defaults.audit_prefix, "cis");
        assert_eq!(config.ssh.connect_timeout, 4);
        assert_eq!(config.ssh.terminal_width, 512);
        assert_eq!(config.device.backup_filesystem, "nvram:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_merge() {
        let base = Config {
            defaults: Defaults {
                remote_user: Some("admin".into()),
                ..Defaults::default()
            },
            ..Config::default()
        };
        let other = Config {
            defaults: Defaults {
                forks: 10,
                ..Defaults::default()
            },
            ..Config::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.defaults.forks, 10);
        assert_eq!(merged.remote_user(), Some("admin"));
    }

    #[test]
    fn test_merge_keeps_earlier_flags_when_later_file_omits_them() {
        let system = Config {
            ssh: SshConfig {
                accept_unknown_hosts: Some(false),
                ..SshConfig::default()
            },
            colors: ColorsConfig {
                enabled: Some(false),
            },
            ..Config::default()
        };
        let user: Config = toml::from_str("[defaults]\nforks = 10\n").unwrap();

        let merged = system.merge(user);
        assert_eq!(merged.defaults.forks, 10);
        assert!(!merged.ssh.accepts_unknown_hosts());
        assert!(!merged.colors.is_enabled());
    }

    #[test]
    fn test_merge_later_file_can_reenable_flags() {
        let system = Config {
            ssh: SshConfig {
                accept_unknown_hosts: Some(false),
                ..SshConfig::default()
            },
            ..Config::default()
        };
        let user: Config = toml::from_str("[ssh]\naccept_unknown_hosts = true\n").unwrap();

        assert!(system.merge(user).ssh.accepts_unknown_hosts());
    }

    #[test]
    fn test_flags_default_to_enabled() {
        let config = Config::default();
        assert!(config.ssh.accepts_unknown_hosts());
        assert!(config.colors.is_enabled());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[defaults]
forks = 20
audit_dir = "/var/log/iosctl"

[ssh]
command_timeout = 300

[device]
backup_filesystem = "flash:"

[device.patterns]
error = ["%Error", "Invalid input"]
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.defaults.forks, 20);
        assert_eq!(config.defaults.audit_dir, PathBuf::from("/var/log/iosctl"));
        assert_eq!(config.ssh.command_timeout, 300);
        assert_eq!(config.ssh.connect_timeout, 4);
        assert_eq!(config.device.backup_filesystem, "flash:");
        assert_eq!(config.device.patterns.error.len(), 2);
        assert_eq!(
            config.device.patterns.copy_success,
            ResponsePatterns::default().copy_success
        );
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "defaults:\n  remote_user: netops\nssh:\n  terminal_width: 200").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.remote_user(), Some("netops"));
        assert_eq!(config.ssh.terminal_width, 200);
    }

    #[test]
    fn test_invalid_pattern_fails_validation() {
        let mut config = Config::default();
        config.device.patterns.denied = vec!["[unclosed".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_forks_fails_validation() {
        let mut config = Config::default();
        config.defaults.forks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("IOSCTL_FORKS", "20");
        std::env::set_var("IOSCTL_TIMEOUT", "90");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.defaults.forks, 20);
        assert_eq!(config.ssh.command_timeout, 90);
        std::env::remove_var("IOSCTL_FORKS");
        std::env::remove_var("IOSCTL_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_is_an_error() {
        let path = PathBuf::from("/nonexistent/iosctl.toml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
