//! Prompt probing and privileged EXEC elevation shared by both sequences.

use tracing::{debug, info};

use super::response::{awaiting_confirmation, parse_prompt, Prompt, Response, ResponseClassifier};
use crate::connection::CliSession;
use crate::error::{Error, Result};

/// Result of probing the device prompt.
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pub prompt: Option<Prompt>,
    pub output: String,
}

impl Probe {
    pub fn privileged(&self) -> bool {
        self.prompt.as_ref().is_some_and(|p| p.privileged)
    }

    pub fn hostname(&self) -> Option<String> {
        self.prompt.as_ref().map(|p| p.hostname.clone())
    }
}

/// Send a bare newline and parse the prompt that comes back.
pub(crate) async fn probe(session: &mut dyn CliSession, host: &str) -> Result<Probe> {
    let output = session.send("").await.map_err(|e| {
        Error::privilege(host, format!("could not read device prompt: {}", e), "")
    })?;
    let prompt = parse_prompt(&output);
    debug!(host = %host, prompt = ?prompt, "Probed device prompt");
    Ok(Probe { prompt, output })
}

/// Enter privileged EXEC mode with `enable` and the secret.
///
/// Returns the device text of the exchange, with the secret itself never
/// echoed by the device.
pub(crate) async fn enable(
    session: &mut dyn CliSession,
    host: &str,
    secret: &str,
    classifier: &ResponseClassifier,
) -> Result<String> {
    info!(host = %host, "Entering privileged EXEC mode");

    let mut output = session
        .send("enable")
        .await
        .map_err(|e| Error::privilege(host, e.to_string(), ""))?;

    if awaiting_confirmation(&output) {
        let reply = session
            .send_secret(secret)
            .await
            .map_err(|e| Error::privilege(host, e.to_string(), output.clone()))?;
        output.push_str(&reply);

        return match classifier.classify_enable(&reply) {
            Response::Success => Ok(output),
            Response::DeviceError(message) => Err(Error::privilege(host, message, output)),
        };
    }

    match classifier.classify_enable(&output) {
        Response::Success => Ok(output),
        Response::DeviceError(message) => Err(Error::privilege(host, message, output)),
    }
}
