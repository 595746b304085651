//! Error types shared by the forwarder primitives.

use thiserror::Error;

/// Rejected answers at the interactive prompts. All of these are recovered
/// by asking the same question again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("token empty")]
    TokenEmpty,

    #[error("target empty")]
    TargetEmpty,

    #[error("port empty")]
    PortEmpty,

    #[error("not a number")]
    NotANumber,

    #[error("port out of range")]
    PortOutOfRange,

    #[error("response empty")]
    ResponseEmpty,

    #[error("invalid selection")]
    InvalidSelection,

    #[error("event invalid")]
    EventInvalid,

    /// Standard input reached end of file.
    #[error("input closed")]
    Closed,
}

/// Errors talking to the messaging platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("device registration failed: {0}")]
    Device(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed")]
    ConnectionClosed,
}

/// Errors starting a listener. These are fatal.
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("failed to listen on {resource}: {source}")]
    Subscribe {
        resource: crate::catalog::Resource,
        #[source]
        source: PlatformError,
    },
}

/// Errors forwarding a single event. These are logged, never fatal.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors building a configuration record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing credential")]
    MissingCredential,

    #[error("missing port")]
    MissingPort,

    #[error("no resource selected")]
    NoSelection,
}
