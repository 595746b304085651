//! Messaging platform seam.
//!
//! [`EventSource`] is the only surface the listeners and the prompts touch:
//! an identity lookup and a realtime event stream per resource.
//! [`WebexClient`] implements it against the platform's REST API and its
//! device WebSocket.

mod activity;
mod webex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::catalog::Resource;
use crate::error::PlatformError;

pub use activity::{public_id, translate_activity};
pub use webex::{DEFAULT_API_URL, DEFAULT_DEVICE_URL, WebexClient};

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub emails: Vec<String>,
}

/// One event delivered by the platform. `value` is relayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformEvent {
    pub resource: Resource,
    pub event: String,
    pub value: Value,
}

impl PlatformEvent {
    pub fn new(resource: Resource, event: impl Into<String>, value: Value) -> Self {
        Self {
            resource,
            event: event.into(),
            value,
        }
    }

    /// `resource:event`, e.g. `messages:created`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.event)
    }
}

/// Realtime event source of the messaging platform.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Resolves the principal the credential belongs to.
    async fn whoami(&self) -> Result<Person, PlatformError>;

    /// Starts the realtime stream for `resource`.
    ///
    /// The receiver may carry events of other resources too; consumers
    /// filter on [`PlatformEvent::resource`].
    async fn listen(
        &self,
        resource: Resource,
    ) -> Result<broadcast::Receiver<PlatformEvent>, PlatformError>;

    /// Stops the realtime stream for `resource`. Best effort.
    async fn stop_listening(&self, resource: Resource);
}

/// Verifies a credential by looking up the identity behind it.
pub async fn verify_credential<S: EventSource + ?Sized>(source: &S) -> Result<Person, PlatformError> {
    let person = source.whoami().await?;
    tracing::info!("token authenticated as {}", person.display_name);
    Ok(person)
}
