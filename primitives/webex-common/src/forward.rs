//! Event forwarder.
//!
//! Every event is relayed as-is in a single POST. Failures are logged and
//! reported back but never retried, and never stop the listeners.

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};

use crate::config::ForwardConfig;
use crate::error::ForwardError;
use crate::platform::PlatformEvent;

/// Result of forwarding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The target answered with this status code.
    Delivered(u16),
    /// The request never got an answer.
    Failed(String),
}

/// Destination for received events.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, event: &PlatformEvent) -> ForwardOutcome;
}

/// POSTs events to `http://{target}:{port}/`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    url: String,
    authority: String,
}

impl HttpForwarder {
    pub fn new(config: &ForwardConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.forward_url(),
            authority: config.authority(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, event: &PlatformEvent) -> Result<StatusCode, ForwardError> {
        let body = serde_json::to_vec(&event.value)?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }
}

#[async_trait]
impl Forward for HttpForwarder {
    async fn forward(&self, event: &PlatformEvent) -> ForwardOutcome {
        tracing::info!("{} received", event.key());

        let outcome = match self.send(event).await {
            Ok(status) => {
                tracing::info!("statusCode: {}", status.as_u16());
                ForwardOutcome::Delivered(status.as_u16())
            }
            Err(e) => {
                tracing::error!("{e}");
                ForwardOutcome::Failed(e.to_string())
            }
        };

        tracing::info!("event forwarded to {}", self.authority);
        tracing::debug!("{}", event.value);

        outcome
    }
}
