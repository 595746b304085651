//! Webex Common - Shared building blocks of the event forwarder
//!
//! Authenticates against the messaging platform, listens to realtime
//! resource events and relays each one as an HTTP POST.
//!
//! # Flow
//!
//! ```text
//! ConfigBuilder ──► verify_credential ──► ListenerRegistry::start
//!                                              │
//!                              EventSource::listen (one WebSocket)
//!                                              │
//!                                              ▼
//!                                   Forward::forward ──► POST target:port
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod forward;
pub mod listener;
pub mod platform;

pub use catalog::{EventSelection, Resource, ResourceSelection};
pub use config::{ConfigBuilder, DEFAULT_TARGET, ForwardConfig};
pub use error::{ConfigError, ForwardError, InputError, ListenerError, PlatformError};
pub use forward::{Forward, ForwardOutcome, HttpForwarder};
pub use listener::{ListenerRegistry, Subscription};
pub use platform::{EventSource, Person, PlatformEvent, WebexClient, verify_credential};
