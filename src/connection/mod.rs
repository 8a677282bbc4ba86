//! Connection layer for device CLI sessions.
//!
//! This module provides the one external dependency of the device sequences:
//! an authenticated, interactive command-line session that sends a line of text
//! and returns the device's textual response.
//!
//! # Overview
//!
//! The sequences in [`crate::network`] never talk to SSH directly. They ask a
//! [`CliTransport`] to open a [`CliSession`] for a device, drive it with
//! [`CliSession::send`], and close it when they are done. This keeps the
//! sequencing logic testable against an in-memory transport.
//!
//! # Supported Transports
//!
//! - **SSH** (via `russh`, `russh` feature, default): interactive shell with a
//!   PTY, prompt detection and terminal setup for Cisco IOS.
//!
//! # Example
//!
//! ```rust,ignore
//! use iosctl::connection::{CliTransport, RusshTransport, SessionConfig};
//! use iosctl::network::DeviceDescriptor;
//!
//! let transport = RusshTransport::new(SessionConfig::default());
//! let device = DeviceDescriptor::new("10.255.138.120", "admin").with_password("secret");
//!
//! let mut session = transport.open(&device).await?;
//! let output = session.send("show version").await?;
//! session.close().await?;
//! ```

/// Session configuration types.
pub mod config;

/// Pure Rust SSH implementation using russh.
#[cfg(feature = "russh")]
pub mod russh;

use async_trait::async_trait;
use thiserror::Error;

use crate::network::DeviceDescriptor;

pub use config::SessionConfig;
#[cfg(feature = "russh")]
pub use self::russh::{RusshSession, RusshTransport};

#[cfg(feature = "russh")]
impl From<::russh::Error> for ConnectionError {
    fn from(err: ::russh::Error) -> Self {
        ConnectionError::SshError(format!("Russh error: {}", err))
    }
}

/// Errors that can occur during session operations.
///
/// Connection refusal, authentication failure and timeouts are kept distinct
/// so callers can report them separately.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish initial connection to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected by the device.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Connection or command timed out.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// The interactive channel could not be opened or written to.
    #[error("Channel error: {0}")]
    ChannelFailed(String),

    /// Configuration is invalid or incomplete.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// SSH-specific error from the underlying implementation.
    #[error("SSH error: {0}")]
    SshError(String),

    /// I/O error during connection operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Session was closed, by us or by the device.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Factory for device sessions.
///
/// A transport is shared between device sequences running concurrently, so it
/// holds configuration only; all per-device state lives in the session it
/// returns.
#[async_trait]
pub trait CliTransport: Send + Sync {
    /// Open an authenticated interactive session to a device.
    async fn open(&self, device: &DeviceDescriptor) -> ConnectionResult<Box<dyn CliSession>>;
}

/// An open, exclusively owned CLI session to one device.
#[async_trait]
pub trait CliSession: Send {
    /// Send one command line and return the device's response verbatim.
    ///
    /// An empty command sends a bare newline, which answers confirmation
    /// questions and re-displays the prompt.
    async fn send(&mut self, command: &str) -> ConnectionResult<String>;

    /// Send a secret (an enable password) without recording it in logs.
    async fn send_secret(&mut self, secret: &str) -> ConnectionResult<String> {
        self.send(secret).await
    }

    /// Close the session. Calling it more than once is harmless.
    async fn close(&mut self) -> ConnectionResult<()>;
}
