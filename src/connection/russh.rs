//! Russh session module
//!
//! Interactive SSH shell sessions for Cisco IOS built on the russh crate.
//! IOS does not offer a usable exec channel on most images, so commands are
//! written to a PTY-backed shell and the response is read until the device
//! prints a prompt or asks a question.

use async_trait::async_trait;
use russh::client::{Handle, Handler, Msg};
use russh::keys::key::PublicKey;
use russh::keys::load_secret_key;
use russh::{Channel, ChannelMsg};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::config::{expand_path, SessionConfig};
use super::{CliSession, CliTransport, ConnectionError, ConnectionResult};
use crate::network::response::is_complete;
use crate::network::DeviceDescriptor;

/// Terminal type requested for the PTY
const TERMINAL_TYPE: &str = "vt100";

/// PTY height in rows
const TERMINAL_ROWS: u32 = 24;

/// Client handler for russh with host key verification
struct ClientHandler {
    host: String,
    port: u16,
    known_hosts: Option<PathBuf>,
    accept_unknown: bool,
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let path = match &self.known_hosts {
            Some(path) if path.exists() => path,
            _ => {
                debug!(host = %self.host, "No known_hosts file, accepting={}", self.accept_unknown);
                return Ok(self.accept_unknown);
            }
        };

        match russh::keys::check_known_hosts_path(&self.host, self.port, server_public_key, path) {
            Ok(true) => {
                debug!(host = %self.host, "Host key verified against known_hosts");
                Ok(true)
            }
            Ok(false) if self.accept_unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, accepting");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "Host not found in known_hosts, rejecting");
                Ok(false)
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                warn!(
                    host = %self.host,
                    line = line,
                    "HOST KEY VERIFICATION FAILED! Server key does not match known_hosts entry."
                );
                Ok(false)
            }
            Err(e) => {
                debug!(host = %self.host, error = %e, "Could not read known_hosts");
                Ok(self.accept_unknown)
            }
        }
    }
}

/// Opens interactive SSH shell sessions.
#[derive(Debug, Clone, Default)]
pub struct RusshTransport {
    config: SessionConfig,
}

impl RusshTransport {
    /// Create a transport with the given session settings.
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl CliTransport for RusshTransport {
    async fn open(&self, device: &DeviceDescriptor) -> ConnectionResult<Box<dyn CliSession>> {
        let session = RusshSession::connect(device, &self.config).await?;
        Ok(Box::new(session))
    }
}

/// An interactive shell on one device.
pub struct RusshSession {
    identifier: String,
    handle: Option<Handle<ClientHandler>>,
    channel: Option<Channel<Msg>>,
    command_timeout: Duration,
}

impl RusshSession {
    /// Connect, authenticate, open a shell and prepare the terminal.
    pub async fn connect(device: &DeviceDescriptor, config: &SessionConfig) -> ConnectionResult<Self> {
        let timeout = config.connect_timeout_duration();
        let handle = tokio::time::timeout(timeout, Self::handshake(device, config))
            .await
            .map_err(|_| ConnectionError::Timeout(config.connect_timeout))??;

        let channel = Self::open_shell(&handle, config).await?;

        let mut session = Self {
            identifier: device.identifier(),
            handle: Some(handle),
            channel: Some(channel),
            command_timeout: config.command_timeout_duration(),
        };

        session.clear_banners(config.settle_duration()).await?;
        session
            .send(&format!("terminal width {}", config.terminal_width))
            .await?;
        session
            .send(&format!("terminal length {}", config.terminal_length))
            .await?;

        debug!(identifier = %session.identifier, "Interactive session ready");
        Ok(session)
    }

    async fn handshake(
        device: &DeviceDescriptor,
        config: &SessionConfig,
    ) -> ConnectionResult<Handle<ClientHandler>> {
        let addr = format!("{}:{}", device.host, device.port);
        let socket = tokio::net::TcpStream::connect(&addr).await.map_err(|e| {
            ConnectionError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
        })?;

        socket.set_nodelay(true).map_err(|e| {
            ConnectionError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        let mut ssh_config = russh::client::Config::default();
        ssh_config.inactivity_timeout = Some(config.command_timeout_duration() * 2);

        let handler = ClientHandler {
            host: device.host.clone(),
            port: device.port,
            known_hosts: config.known_hosts_path(),
            accept_unknown: config.accept_unknown_hosts,
        };

        let mut handle = russh::client::connect_stream(Arc::new(ssh_config), socket, handler)
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(format!("SSH handshake failed: {}", e)))?;

        Self::authenticate(&mut handle, device).await?;
        debug!(host = %device.host, "SSH connection established successfully");
        Ok(handle)
    }

    /// Private key first, then password.
    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        device: &DeviceDescriptor,
    ) -> ConnectionResult<()> {
        let user = device.username();

        if let Some(key_file) = &device.credentials.private_key {
            let key_path = expand_path(&key_file.to_string_lossy());
            match Self::try_key_auth(handle, user, &key_path).await {
                Ok(()) => {
                    debug!(key = %key_path.display(), "Authenticated using key");
                    return Ok(());
                }
                Err(e) => debug!(key = %key_path.display(), error = %e, "Key authentication failed"),
            }
        }

        if let Some(password) = &device.credentials.password {
            let authenticated = handle
                .authenticate_password(user, password)
                .await
                .map_err(|e| {
                    ConnectionError::AuthenticationFailed(format!(
                        "Password authentication failed: {}",
                        e
                    ))
                })?;

            if authenticated {
                debug!("Authenticated using password");
                return Ok(());
            }
        }

        Err(ConnectionError::AuthenticationFailed(
            "All authentication methods failed".to_string(),
        ))
    }

    async fn try_key_auth(
        handle: &mut Handle<ClientHandler>,
        user: &str,
        key_path: &Path,
    ) -> ConnectionResult<()> {
        let key_pair = load_secret_key(key_path, None).map_err(|e| {
            ConnectionError::AuthenticationFailed(format!(
                "Failed to load key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        let authenticated = handle
            .authenticate_publickey(user, Arc::new(key_pair))
            .await
            .map_err(|e| ConnectionError::AuthenticationFailed(e.to_string()))?;

        if authenticated {
            Ok(())
        } else {
            Err(ConnectionError::AuthenticationFailed(
                "Key authentication failed".to_string(),
            ))
        }
    }

    async fn open_shell(
        handle: &Handle<ClientHandler>,
        config: &SessionConfig,
    ) -> ConnectionResult<Channel<Msg>> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ConnectionError::ChannelFailed(format!("Failed to open channel: {}", e)))?;

        channel
            .request_pty(
                true,
                TERMINAL_TYPE,
                config.terminal_width,
                TERMINAL_ROWS,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| ConnectionError::ChannelFailed(format!("PTY request failed: {}", e)))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| ConnectionError::ChannelFailed(format!("Shell request failed: {}", e)))?;

        Ok(channel)
    }

    /// Discard login banners: read until a prompt or until the line goes quiet.
    async fn clear_banners(&mut self, settle: Duration) -> ConnectionResult<()> {
        let channel = self.channel.as_mut().ok_or(ConnectionError::ConnectionClosed)?;
        let mut buffer = Vec::new();

        loop {
            match tokio::time::timeout(settle, channel.wait()).await {
                Err(_) => break,
                Ok(None) | Ok(Some(ChannelMsg::Close)) | Ok(Some(ChannelMsg::Eof)) => {
                    return Err(ConnectionError::ConnectionClosed)
                }
                Ok(Some(ChannelMsg::Data { ref data })) => {
                    buffer.extend_from_slice(data);
                    if is_complete(&String::from_utf8_lossy(&buffer)) {
                        break;
                    }
                }
                Ok(Some(_)) => {}
            }
        }

        trace!(bytes = buffer.len(), "Cleared login banners");
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> ConnectionResult<()> {
        let channel = self.channel.as_ref().ok_or(ConnectionError::ConnectionClosed)?;
        let data = format!("{}\n", line);
        channel
            .data(data.as_bytes())
            .await
            .map_err(|e| ConnectionError::ChannelFailed(format!("Failed to write to channel: {}", e)))
    }

    /// Read until the response ends in a prompt or a question.
    async fn read_response(&mut self) -> ConnectionResult<String> {
        let timeout = self.command_timeout;
        let channel = self.channel.as_mut().ok_or(ConnectionError::ConnectionClosed)?;
        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::new();

        loop {
            let msg = tokio::time::timeout_at(deadline, channel.wait())
                .await
                .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => buffer.extend_from_slice(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => buffer.extend_from_slice(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ConnectionError::ConnectionClosed)
                }
                Some(_) => continue,
            }

            let text = String::from_utf8_lossy(&buffer);
            if is_complete(&text) {
                return Ok(text.into_owned());
            }
        }
    }
}

#[async_trait]
impl CliSession for RusshSession {
    async fn send(&mut self, command: &str) -> ConnectionResult<String> {
        trace!(identifier = %self.identifier, command = %command, "Sending command");
        self.write_line(command).await?;
        let output = self.read_response().await?;
        trace!(identifier = %self.identifier, bytes = output.len(), "Received response");
        Ok(output)
    }

    async fn send_secret(&mut self, secret: &str) -> ConnectionResult<String> {
        trace!(identifier = %self.identifier, "Sending secret");
        self.write_line(secret).await?;
        self.read_response().await
    }

    async fn close(&mut self) -> ConnectionResult<()> {
        if let Some(channel) = self.channel.take() {
            debug!(identifier = %self.identifier, "Closing SSH session");
            let _ = channel.data(&b"exit\n"[..]).await;
            let _ = channel.eof().await;
            let _ = channel.close().await;
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "English")
                .await
            {
                // The device usually drops the connection itself after `exit`.
                debug!(identifier = %self.identifier, error = %e, "Disconnect after exit");
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for RusshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshSession")
            .field("identifier", &self.identifier)
            .field("open", &self.channel.is_some())
            .finish()
    }
}
