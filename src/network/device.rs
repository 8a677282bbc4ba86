//! Device descriptors and login credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Login credentials for a device.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Login username
    pub username: String,
    /// Login password
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Private key file used before the password
    #[serde(default)]
    pub private_key: Option<PathBuf>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// A network device to audit or configure.
///
/// Supplied per invocation and never persisted.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Address or hostname
    pub host: String,
    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login credentials
    pub credentials: Credentials,
    /// Enable secret for privileged EXEC mode
    #[serde(default, skip_serializing)]
    pub enable_secret: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl DeviceDescriptor {
    /// Create a descriptor with a username and no secrets.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credentials: Credentials {
                username: username.into(),
                ..Credentials::default()
            },
            enable_secret: None,
        }
    }

    /// Set the login password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = Some(password.into());
        self
    }

    /// Set the enable secret.
    pub fn with_enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(secret.into());
        self
    }

    /// Set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set a private key file for authentication.
    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials.private_key = Some(path.into());
        self
    }

    /// Login username
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// `user@host:port`
    pub fn identifier(&self) -> String {
        format!("{}@{}:{}", self.credentials.username, self.host, self.port)
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.credentials)
            .field("enable_secret", &self.enable_secret.as_ref().map(|_| "********"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let device = DeviceDescriptor::new("10.255.138.120", "admin")
            .with_password("foo")
            .with_enable_secret("bar")
            .with_port(2222);
        assert_eq!(device.username(), "admin");
        assert_eq!(device.port, 2222);
        assert_eq!(device.identifier(), "admin@10.255.138.120:2222");
        assert_eq!(device.enable_secret.as_deref(), Some("bar"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let device = DeviceDescriptor::new("r1", "admin")
            .with_password("hunter2")
            .with_enable_secret("s3cret");
        let text = format!("{:?}", device);
        assert!(text.contains("admin"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("s3cret"));
    }

    #[test]
    fn test_serialize_skips_secrets() {
        let device = DeviceDescriptor::new("r1", "admin")
            .with_password("hunter2")
            .with_enable_secret("s3cret");
        let json = serde_json::to_string(&device).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_default_port_on_deserialize() {
        let device: DeviceDescriptor =
            serde_yaml::from_str("host: r1\ncredentials:\n  username: admin\n").unwrap();
        assert_eq!(device.port, DEFAULT_SSH_PORT);
    }
}
