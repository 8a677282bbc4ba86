//! Device command sequences for Cisco IOS.
//!
//! Two linear per-device sequences run over a [`CliSession`]:
//!
//! - [`Auditor`] runs an ordered list of read-only commands and captures each
//!   output verbatim.
//! - [`Installer`] backs up the running configuration, copies a new
//!   configuration from a URL into it, and persists the result to
//!   startup-config.
//!
//! Both close the session on every exit path once it has been opened.
//!
//! [`CliSession`]: crate::connection::CliSession

pub mod audit;
pub mod audit_log;
pub mod device;
pub mod install;
mod privilege;
pub mod response;

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::Error;

pub use audit::{AuditReport, Auditor, CommandOutput};
pub use audit_log::AuditLogWriter;
pub use device::{Credentials, DeviceDescriptor, DEFAULT_SSH_PORT};
pub use install::{
    backup_destination, check_backup_name, ConfigUrl, InstallFailure, InstallReport, InstallState,
    Installer, StepRecord,
};
pub use response::{
    awaiting_confirmation, parse_prompt, Prompt, Response, ResponseClassifier, ResponsePatterns,
};

/// A step of a device sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Opening the session
    Connect,
    /// Reading the prompt to learn hostname and privilege level
    Probe,
    /// Entering privileged EXEC mode
    Elevate,
    /// Saving running-config to device storage
    Backup,
    /// Copying the new configuration into running-config
    Configure,
    /// Saving running-config to startup-config
    Persist,
    /// Running an audit command
    Command,
    /// Closing the session
    Disconnect,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Probe => "probe",
            Stage::Elevate => "elevate",
            Stage::Backup => "backup",
            Stage::Configure => "configure",
            Stage::Persist => "persist",
            Stage::Command => "command",
            Stage::Disconnect => "disconnect",
        };
        write!(f, "{}", name)
    }
}

pub(crate) fn serialize_error<S>(error: &Option<Error>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
