//! Device response classification.
//!
//! All scanning of device text happens here: prompt parsing, detection of
//! interactive questions, and classification of command responses against
//! configurable pattern sets.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Device prompt at the end of a response: `name#`, `name>` or `name(config)#`
static PROMPT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.\-]*)(?:\([A-Za-z0-9_.\-]+\))?([#>])$")
        .expect("Invalid prompt regex")
});

/// Interactive questions the device asks before completing a command
static QUESTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\]\?|\[confirm\]|\[yes/no\]:?|[Pp]assword:)$").expect("Invalid question regex")
});

/// Default markers of a failed command
pub const DEFAULT_ERROR_PATTERNS: &[&str] = &[
    r"Error opening",
    r"Invalid input",
    r"%\s*Error",
    r"% Incomplete command",
    r"% Unknown command",
    r"%\s*Bad",
];

/// Default markers of a completed copy
pub const DEFAULT_COPY_SUCCESS_PATTERNS: &[&str] = &[r"\[OK", r"bytes copied"];

/// Default markers of a refused `enable`
pub const DEFAULT_DENIED_PATTERNS: &[&str] =
    &[r"Access denied", r"% Bad secrets", r"% Access denied"];

/// Prompt information gleaned from the end of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Hostname shown in the prompt
    pub hostname: String,
    /// True for `#` (privileged EXEC), false for `>` (user EXEC)
    pub privileged: bool,
}

/// Outcome of classifying a device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The command completed
    Success,
    /// The device reported a failure; carries the offending line or a reason
    DeviceError(String),
}

impl Response {
    /// Returns true for [`Response::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success)
    }
}

/// Regex pattern sets used to classify responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsePatterns {
    /// Any match marks a command as failed
    pub error: Vec<String>,
    /// At least one match is required for a copy to count as complete
    pub copy_success: Vec<String>,
    /// Any match marks an `enable` attempt as refused
    pub denied: Vec<String>,
}

impl Default for ResponsePatterns {
    fn default() -> Self {
        let owned = |p: &[&str]| p.iter().map(|s| s.to_string()).collect();
        Self {
            error: owned(DEFAULT_ERROR_PATTERNS),
            copy_success: owned(DEFAULT_COPY_SUCCESS_PATTERNS),
            denied: owned(DEFAULT_DENIED_PATTERNS),
        }
    }
}

/// Classifies device responses of the install and audit sequences.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    errors: RegexSet,
    copy_success: RegexSet,
    denied: RegexSet,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(&ResponsePatterns::default()).expect("default response patterns are valid")
    }
}

impl ResponseClassifier {
    /// Compile a classifier from pattern sets.
    pub fn new(patterns: &ResponsePatterns) -> Result<Self> {
        Ok(Self {
            errors: RegexSet::new(&patterns.error)?,
            copy_success: RegexSet::new(&patterns.copy_success)?,
            denied: RegexSet::new(&patterns.denied)?,
        })
    }

    /// Classify the response to a `copy ... <destination>` that writes device storage.
    pub fn classify_copy(&self, output: &str) -> Response {
        if let Some(line) = first_match(&self.errors, output) {
            return Response::DeviceError(line);
        }
        if let Some(unanswered) = unanswered_question(output) {
            return unanswered;
        }
        if self.copy_success.is_match(output) {
            Response::Success
        } else {
            Response::DeviceError("no completion marker in device response".to_string())
        }
    }

    /// Classify the response to `copy <url> running-config`.
    pub fn classify_configure(&self, output: &str) -> Response {
        if let Some(line) = first_match(&self.errors, output) {
            return Response::DeviceError(line);
        }
        match unanswered_question(output) {
            Some(unanswered) => unanswered,
            None => Response::Success,
        }
    }

    /// Classify the response to the enable secret.
    pub fn classify_enable(&self, output: &str) -> Response {
        if let Some(line) = first_match(&self.denied, output) {
            return Response::DeviceError(line);
        }
        if awaiting_confirmation(output) {
            return Response::DeviceError("device asked for the secret again".to_string());
        }
        match parse_prompt(output) {
            Some(prompt) if !prompt.privileged => {
                Response::DeviceError(format!("prompt '{}>' is still user EXEC", prompt.hostname))
            }
            _ => Response::Success,
        }
    }

    /// Returns true if the output carries any error marker.
    pub fn has_error(&self, output: &str) -> bool {
        self.errors.is_match(output)
    }
}

/// A copy left at a question never completed.
fn unanswered_question(output: &str) -> Option<Response> {
    if !awaiting_confirmation(output) {
        return None;
    }
    let question = last_line(output).unwrap_or_default();
    Some(Response::DeviceError(format!(
        "device is still waiting for an answer: {}",
        question
    )))
}

fn first_match(set: &RegexSet, output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| set.is_match(line))
        .map(|line| line.trim().to_string())
}

fn last_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
}

/// Parse the device prompt ending a response.
pub fn parse_prompt(output: &str) -> Option<Prompt> {
    let line = last_line(output)?;
    let caps = PROMPT_REGEX.captures(line)?;
    Some(Prompt {
        hostname: caps[1].to_string(),
        privileged: &caps[2] == "#",
    })
}

/// Returns true if the response ends in a question awaiting an answer.
pub fn awaiting_confirmation(output: &str) -> bool {
    last_line(output).is_some_and(|line| QUESTION_REGEX.is_match(line))
}

/// Returns true once a response is complete: it ends in a prompt or a question.
pub fn is_complete(output: &str) -> bool {
    parse_prompt(output).is_some() || awaiting_confirmation(output)
}
