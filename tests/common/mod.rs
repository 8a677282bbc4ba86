//! Shared test utilities for the iosctl test suite.
//!
//! This module provides a scripted in-memory device:
//! - [`MockTransport`] implements `CliTransport` and records every session event
//! - sessions answer like a Cisco IOS CLI (prompts, copy confirmations, enable)
//! - failures can be injected per host at open time and per command prefix
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use iosctl::connection::{CliSession, CliTransport, ConnectionError, ConnectionResult};
use iosctl::network::DeviceDescriptor;

/// Enable secret the mock device accepts
pub const GOOD_SECRET: &str = "s3cret";

/// Marker recorded instead of the secret text
pub const SECRET_MARKER: &str = "<secret>";

/// Config URL used throughout the tests
pub const CONFIG_URL: &str = "tftp://10.255.40.101/sdn/lab_config_files/ios_config.cfg";

/// How opening a session fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    Refused,
    Auth,
    Timeout,
}

/// Something that happened on a mock session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Send(String),
    Close,
}

#[derive(Debug)]
struct MockState {
    hostname: String,
    start_privileged: AtomicBool,
    events: RwLock<Vec<(String, Event)>>,
    responses: RwLock<HashMap<String, String>>,
    questions: RwLock<HashMap<String, String>>,
    failures: RwLock<Vec<String>>,
    open_failures: RwLock<HashMap<String, OpenFailure>>,
    close_count: AtomicU32,
    close_fails: AtomicBool,
}

/// A scripted Cisco IOS device reachable through any host name.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// A device named `router` that logs in at the privileged `#` prompt.
    pub fn privileged() -> Self {
        Self::new("router", true)
    }

    /// A device named `router` that logs in at the user `>` prompt.
    pub fn user_mode() -> Self {
        Self::new("router", false)
    }

    pub fn new(hostname: &str, privileged: bool) -> Self {
        Self {
            state: Arc::new(MockState {
                hostname: hostname.to_string(),
                start_privileged: AtomicBool::new(privileged),
                events: RwLock::new(Vec::new()),
                responses: RwLock::new(HashMap::new()),
                questions: RwLock::new(HashMap::new()),
                failures: RwLock::new(Vec::new()),
                open_failures: RwLock::new(HashMap::new()),
                close_count: AtomicU32::new(0),
                close_fails: AtomicBool::new(false),
            }),
        }
    }

    /// Shared handle usable by the sequences.
    pub fn shared(&self) -> Arc<dyn CliTransport> {
        Arc::new(self.clone())
    }

    /// Answer `command` with `text` verbatim.
    pub fn respond(&self, command: impl Into<String>, text: impl Into<String>) {
        self.state.responses.write().insert(command.into(), text.into());
    }

    /// Leave `command` at `question`, repeating it for every bare newline.
    pub fn ask_forever(&self, command: impl Into<String>, question: impl Into<String>) {
        self.state
            .questions
            .write()
            .insert(command.into(), question.into());
    }

    /// Fail any command starting with `prefix` at the transport level.
    /// An empty prefix fails bare newlines only.
    pub fn fail_on(&self, prefix: impl Into<String>) {
        self.state.failures.write().push(prefix.into());
    }

    /// Fail opening sessions to `host`.
    pub fn fail_open(&self, host: impl Into<String>, failure: OpenFailure) {
        self.state.open_failures.write().insert(host.into(), failure);
    }

    /// Make `close` return an error.
    pub fn fail_close(&self) {
        self.state.close_fails.store(true, Ordering::SeqCst);
    }

    /// Number of `close` calls across all sessions.
    pub fn close_count(&self) -> u32 {
        self.state.close_count.load(Ordering::SeqCst)
    }

    /// All events, in order, for every host.
    pub fn events(&self) -> Vec<(String, Event)> {
        self.state.events.read().clone()
    }

    /// Lines sent to `host`, in order (`""` is a bare newline).
    pub fn sent_to(&self, host: &str) -> Vec<String> {
        self.state
            .events
            .read()
            .iter()
            .filter(|(h, _)| h == host)
            .filter_map(|(_, e)| match e {
                Event::Send(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Non-empty lines sent to `host`, in order.
    pub fn commands_to(&self, host: &str) -> Vec<String> {
        self.sent_to(host)
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Closes recorded for `host`.
    pub fn closes_for(&self, host: &str) -> usize {
        self.state
            .events
            .read()
            .iter()
            .filter(|(h, e)| h == host && *e == Event::Close)
            .count()
    }
}

#[async_trait]
impl CliTransport for MockTransport {
    async fn open(&self, device: &DeviceDescriptor) -> ConnectionResult<Box<dyn CliSession>> {
        let failure = self.state.open_failures.read().get(&device.host).copied();
        if let Some(failure) = failure {
            return Err(match failure {
                OpenFailure::Refused => {
                    ConnectionError::ConnectionFailed("connection refused".to_string())
                }
                OpenFailure::Auth => {
                    ConnectionError::AuthenticationFailed("bad password".to_string())
                }
                OpenFailure::Timeout => ConnectionError::Timeout(4),
            });
        }

        self.state
            .events
            .write()
            .push((device.host.clone(), Event::Open));

        Ok(Box::new(MockSession {
            host: device.host.clone(),
            privileged: self.state.start_privileged.load(Ordering::SeqCst),
            pending: None,
            question: None,
            closed: false,
            state: Arc::clone(&self.state),
        }))
    }
}

/// One scripted session.
pub struct MockSession {
    host: String,
    privileged: bool,
    pending: Option<String>,
    question: Option<String>,
    closed: bool,
    state: Arc<MockState>,
}

impl MockSession {
    fn prompt(&self) -> String {
        let mark = if self.privileged { '#' } else { '>' };
        format!("\r\n{}{}", self.state.hostname, mark)
    }

    fn record(&self, line: &str) -> ConnectionResult<()> {
        self.state
            .events
            .write()
            .push((self.host.clone(), Event::Send(line.to_string())));

        if self.closed {
            return Err(ConnectionError::ConnectionClosed);
        }
        let injected = self
            .state
            .failures
            .read()
            .iter()
            .any(|prefix| match prefix.as_str() {
                "" => line.is_empty(),
                prefix => line.starts_with(prefix),
            });
        if injected {
            return Err(ConnectionError::ChannelFailed(format!(
                "injected failure on '{}'",
                line
            )));
        }
        Ok(())
    }

    fn answer(&mut self, command: &str) -> String {
        if let Some(text) = self.state.responses.read().get(command) {
            return text.clone();
        }

        if let Some(question) = self.state.questions.read().get(command) {
            self.question = Some(question.clone());
            return format!("{}\r\n{}", command, question);
        }

        if command.is_empty() {
            if let Some(question) = &self.question {
                return format!("\r\n{}", question);
            }
            return match self.pending.take() {
                Some(done) => format!("{}{}", done, self.prompt()),
                None => self.prompt(),
            };
        }

        if command == "enable" {
            return "\r\nPassword: ".to_string();
        }

        if let Some(rest) = command.strip_prefix("copy running-config ") {
            self.pending = Some("\r\nBuilding configuration...\r\n[OK]".to_string());
            return format!("{}\r\nDestination filename [{}]? ", command, rest);
        }

        if command.starts_with("copy ") && command.ends_with(" running-config") {
            self.pending = Some(
                "\r\nAccessing source...\r\nLoading ios_config.cfg [OK - 48 bytes]\r\n48 bytes copied in 0.512 secs (94 bytes/sec)"
                    .to_string(),
            );
            return format!("{}\r\nDestination filename [running-config]? ", command);
        }

        format!("{}\r\noutput of {}{}", command, command, self.prompt())
    }
}

#[async_trait]
impl CliSession for MockSession {
    async fn send(&mut self, command: &str) -> ConnectionResult<String> {
        self.record(command)?;
        Ok(self.answer(command))
    }

    async fn send_secret(&mut self, secret: &str) -> ConnectionResult<String> {
        self.record(SECRET_MARKER)?;
        if let Some(text) = self.state.responses.read().get(SECRET_MARKER) {
            return Ok(text.clone());
        }
        if secret == GOOD_SECRET {
            self.privileged = true;
            Ok(self.prompt())
        } else {
            Ok(format!("\r\n% Access denied\r\n{}", self.prompt()))
        }
    }

    async fn close(&mut self) -> ConnectionResult<()> {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        self.state
            .events
            .write()
            .push((self.host.clone(), Event::Close));
        self.closed = true;

        if self.state.close_fails.load(Ordering::SeqCst) {
            return Err(ConnectionError::ChannelFailed("close failed".to_string()));
        }
        Ok(())
    }
}

/// A descriptor for `host` with a login password.
pub fn device(host: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(host, "admin").with_password("foo")
}

/// A descriptor for `host` with the accepted enable secret.
pub fn device_with_secret(host: &str) -> DeviceDescriptor {
    device(host).with_enable_secret(GOOD_SECRET)
}
