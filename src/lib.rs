//! # iosctl - Cisco IOS audit and configuration over SSH
//!
//! iosctl drives Cisco IOS routers and switches through their interactive
//! command line. It supports two per-device sequences:
//!
//! - **Audit**: run an ordered list of `show` commands and capture each
//!   output verbatim, for storage and auditing.
//! - **Install**: back up the running configuration to device storage, copy a
//!   new configuration into it from an FTP/TFTP URL, and save the result to
//!   startup-config.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                CLI (iosctl)                  │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │       BatchRunner (forks, one task/device)   │
//! └──────────────────────────────────────────────┘
//!              │                     │
//!              ▼                     ▼
//! ┌──────────────────────┐ ┌──────────────────────┐
//! │       Auditor        │ │      Installer       │
//! └──────────────────────┘ └──────────────────────┘
//!              │                     │
//!              └──────────┬──────────┘
//!                         ▼
//! ┌──────────────────────────────────────────────┐
//! │  CliTransport / CliSession (russh shell)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use iosctl::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = Arc::new(RusshTransport::new(SessionConfig::default()));
//!     let device = DeviceDescriptor::new("10.255.138.120", "admin")
//!         .with_password("secret")
//!         .with_enable_secret("enable");
//!
//!     let installer = Installer::new(transport);
//!     let url = ConfigUrl::parse("tftp://10.255.40.101/ios_config.cfg")?;
//!     match installer.run(&device, &url, None).await {
//!         Ok(report) => println!("changed: {}", report.changed()),
//!         Err(failure) => eprintln!("failed: {}", failure.error),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::Config;
    pub use crate::connection::{
        CliSession, CliTransport, ConnectionError, ConnectionResult, SessionConfig,
    };
    #[cfg(feature = "russh")]
    pub use crate::connection::{RusshSession, RusshTransport};
    pub use crate::error::{Error, Result};
    pub use crate::executor::{BatchRunner, InstallOutcome};
    pub use crate::network::{
        AuditLogWriter, AuditReport, Auditor, CommandOutput, ConfigUrl, DeviceDescriptor,
        InstallFailure, InstallReport, InstallState, Installer, Prompt, Response,
        ResponseClassifier, ResponsePatterns, Stage, StepRecord,
    };
}

/// Error types.
pub mod error;

/// Session transport: the traits the sequences drive and the SSH implementation.
pub mod connection;

/// Device descriptors, response classification and the audit/install sequences.
pub mod network;

/// Concurrent execution of device sequences.
pub mod executor;

/// Configuration loading.
pub mod config;

pub use error::{Error, Result};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
