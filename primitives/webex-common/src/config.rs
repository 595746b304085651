//! Configuration record for a forwarding session.
//!
//! The record is assembled one answer at a time by [`ConfigBuilder`] and is
//! immutable once [`ConfigBuilder::build`] hands it to the listeners.

use std::fmt;

use crate::catalog::{EventSelection, Resource, ResourceSelection};
use crate::error::{ConfigError, InputError};

/// Host events are forwarded to when no target is given.
pub const DEFAULT_TARGET: &str = "localhost";

/// Everything a forwarding session needs.
#[derive(Clone)]
pub struct ForwardConfig {
    pub target: String,
    pub credential: String,
    pub port: u16,
    pub selection: Vec<(Resource, EventSelection)>,
}

impl ForwardConfig {
    /// URL every event is POSTed to.
    pub fn forward_url(&self) -> String {
        format!("http://{}:{}/", self.target, self.port)
    }

    /// `target:port`, as shown in log lines.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.target, self.port)
    }
}

impl fmt::Debug for ForwardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardConfig")
            .field("target", &self.target)
            .field("credential", &"<redacted>")
            .field("port", &self.port)
            .field("selection", &self.selection)
            .finish()
    }
}

/// Incremental builder used by both the prompts and the environment fast-path.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    target: Option<String>,
    credential: Option<String>,
    port: Option<u16>,
    selection: Vec<(Resource, EventSelection)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Selects one resource/event pair, or the whole catalog with every event.
    pub fn select(mut self, resource: ResourceSelection, event: EventSelection) -> Self {
        self.selection = match resource {
            ResourceSelection::All => Resource::ALL
                .into_iter()
                .map(|r| (r, EventSelection::All))
                .collect(),
            ResourceSelection::One(r) => vec![(r, event)],
        };
        self
    }

    /// Selects every resource and every event.
    pub fn firehose(self) -> Self {
        self.select(ResourceSelection::All, EventSelection::All)
    }

    pub fn build(self) -> Result<ForwardConfig, ConfigError> {
        let credential = self.credential.ok_or(ConfigError::MissingCredential)?;
        let port = self.port.ok_or(ConfigError::MissingPort)?;

        if self.selection.is_empty() {
            return Err(ConfigError::NoSelection);
        }

        Ok(ForwardConfig {
            target: self.target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            credential,
            port,
            selection: self.selection,
        })
    }
}

/// Validates a credential answer.
pub fn parse_credential(answer: &str) -> Result<String, InputError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(InputError::TokenEmpty);
    }
    Ok(answer.to_string())
}

/// Validates a target host answer.
pub fn parse_target(answer: &str) -> Result<String, InputError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(InputError::TargetEmpty);
    }
    Ok(answer.to_string())
}

/// Validates a port answer.
pub fn parse_port(answer: &str) -> Result<u16, InputError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(InputError::PortEmpty);
    }
    if !answer.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber);
    }

    match answer.parse::<u16>() {
        Ok(0) | Err(_) => Err(InputError::PortOutOfRange),
        Ok(port) => Ok(port),
    }
}
