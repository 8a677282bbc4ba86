//! Error types for iosctl.
//!
//! This module defines the error types used throughout iosctl. Every failure of
//! a device sequence is reported as one of the stage-specific variants below,
//! carrying the device text captured at the point of failure.

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::network::Stage;

/// Result type alias for iosctl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for iosctl.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Failed to connect to the device (unreachable, refused, handshake failure).
    #[error("Failed to connect to '{host}': {message}")]
    Connection {
        /// Target host
        host: String,
        /// Error message
        message: String,
    },

    /// Connection or command timed out.
    #[error("Connection to '{host}' timed out after {timeout_secs} seconds")]
    ConnectionTimeout {
        /// Target host
        host: String,
        /// Timeout in seconds
        timeout_secs: u64,
    },

    /// Login credentials were rejected.
    #[error("Authentication failed for '{user}@{host}': {message}")]
    Authentication {
        /// Username
        user: String,
        /// Target host
        host: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Sequence Errors
    // ========================================================================
    /// Privileged mode was required but could not be entered.
    #[error("Failed to enter privileged mode on '{host}': {message}")]
    Privilege {
        /// Target host
        host: String,
        /// Error message
        message: String,
        /// Device text captured during elevation
        output: String,
    },

    /// Saving the running configuration to device storage failed.
    #[error("Backup of running-config to '{destination}' failed on '{host}': {message}")]
    Backup {
        /// Target host
        host: String,
        /// Backup destination on the device
        destination: String,
        /// Error message
        message: String,
        /// Device text captured during the backup
        output: String,
    },

    /// The device rejected the configuration or could not fetch the URL.
    #[error("Failed to apply configuration from '{url}' on '{host}': {message}")]
    Configure {
        /// Target host
        host: String,
        /// Configuration source URL
        url: String,
        /// Error message
        message: String,
        /// Device text captured during the configure step
        output: String,
    },

    /// Saving to startup-config failed after a successful configure.
    ///
    /// The device is running the new configuration, but it will not survive a
    /// reload.
    #[error("Configuration applied on '{host}' but saving to startup-config failed: {message}")]
    Persist {
        /// Target host
        host: String,
        /// Error message
        message: String,
        /// Device text captured during the persist step
        output: String,
    },

    /// A command of an audit run failed at the transport level.
    #[error("Command '{command}' failed on '{host}': {message}")]
    Command {
        /// Target host
        host: String,
        /// Command being sent
        command: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Invalid response pattern.
    #[error("Invalid response pattern: {0}")]
    Regex(#[from] regex::Error),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Maps a transport error raised while opening a session.
    pub fn from_connect(host: &str, user: &str, err: ConnectionError) -> Self {
        match err {
            ConnectionError::AuthenticationFailed(message) => Self::Authentication {
                user: user.to_string(),
                host: host.to_string(),
                message,
            },
            ConnectionError::Timeout(timeout_secs) => Self::ConnectionTimeout {
                host: host.to_string(),
                timeout_secs,
            },
            other => Self::Connection {
                host: host.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Creates a new backup error.
    pub fn backup(
        host: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Backup {
            host: host.into(),
            destination: destination.into(),
            message: message.into(),
            output: output.into(),
        }
    }

    /// Creates a new configure error.
    pub fn configure(
        host: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Configure {
            host: host.into(),
            url: url.into(),
            message: message.into(),
            output: output.into(),
        }
    }

    /// Creates a new persist error.
    pub fn persist(
        host: impl Into<String>,
        message: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Persist {
            host: host.into(),
            message: message.into(),
            output: output.into(),
        }
    }

    /// Creates a new privilege error.
    pub fn privilege(
        host: impl Into<String>,
        message: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Privilege {
            host: host.into(),
            message: message.into(),
            output: output.into(),
        }
    }

    /// The sequence stage this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Connection { .. }
            | Error::ConnectionTimeout { .. }
            | Error::Authentication { .. } => Some(Stage::Connect),
            Error::Privilege { .. } => Some(Stage::Elevate),
            Error::Backup { .. } => Some(Stage::Backup),
            Error::Configure { .. } => Some(Stage::Configure),
            Error::Persist { .. } => Some(Stage::Persist),
            Error::Command { .. } => Some(Stage::Command),
            _ => None,
        }
    }

    /// Device text captured when the error occurred.
    pub fn device_output(&self) -> Option<&str> {
        match self {
            Error::Privilege { output, .. }
            | Error::Backup { output, .. }
            | Error::Configure { output, .. }
            | Error::Persist { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }

    /// Returns true if the device could not be reached or logged into.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::ConnectionTimeout { .. } | Error::Authentication { .. }
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Privilege { .. }
            | Error::Backup { .. }
            | Error::Configure { .. }
            | Error::Persist { .. }
            | Error::Command { .. } => 2,
            Error::Connection { .. }
            | Error::ConnectionTimeout { .. }
            | Error::Authentication { .. } => 3,
            _ => 1,
        }
    }
}
