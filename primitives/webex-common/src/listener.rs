//! Listener registry.
//!
//! Owns one [`Subscription`] per started resource/event pair together with
//! the count of active listeners. Shutdown cancels every live handle; the
//! process may exit once [`ListenerRegistry::active`] is back to zero.

use std::sync::Arc;

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::catalog::{EventSelection, Resource};
use crate::error::ListenerError;
use crate::forward::Forward;
use crate::platform::{EventSource, PlatformEvent};

/// Handle to one running listener.
#[derive(Debug)]
pub struct Subscription {
    resource: Resource,
    selection: EventSelection,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn selection(&self) -> &EventSelection {
        &self.selection
    }

    /// Stops forwarding and tells the platform to stop the stream.
    pub async fn cancel<S: EventSource + ?Sized>(self, source: &S) {
        tracing::info!(
            "stopping listener for {}:{}",
            self.resource.name().to_uppercase(),
            self.selection.name().to_uppercase()
        );

        self.task.abort();
        source.stop_listening(self.resource).await;

        for event in self.selection.concrete_events(self.resource) {
            tracing::debug!("deregistered handler for {}:{event}", self.resource);
        }
    }
}

/// All listeners of the process.
pub struct ListenerRegistry {
    source: Arc<dyn EventSource>,
    forwarder: Arc<dyn Forward>,
    subscriptions: Vec<Subscription>,
    active: usize,
}

impl ListenerRegistry {
    pub fn new(source: Arc<dyn EventSource>, forwarder: Arc<dyn Forward>) -> Self {
        Self {
            source,
            forwarder,
            subscriptions: Vec::new(),
            active: 0,
        }
    }

    /// Number of listeners started and not yet cancelled.
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Starts forwarding `selection` events of `resource`.
    pub async fn start(
        &mut self,
        resource: Resource,
        selection: EventSelection,
    ) -> Result<(), ListenerError> {
        self.active += 1;

        let receiver = match self.source.listen(resource).await {
            Ok(receiver) => receiver,
            Err(source) => {
                self.active -= 1;
                return Err(ListenerError::Subscribe { resource, source });
            }
        };

        tracing::info!("Listening for events from the {resource} resource");
        for event in selection.concrete_events(resource) {
            tracing::info!("Registered handler to forward {resource}:{event} events");
        }

        let task = tokio::spawn(pump(
            receiver,
            resource,
            selection.clone(),
            Arc::clone(&self.forwarder),
        ));

        self.subscriptions.push(Subscription {
            resource,
            selection,
            task,
        });

        Ok(())
    }

    /// Starts every pair in order, stopping at the first failure.
    pub async fn start_all(
        &mut self,
        selection: &[(Resource, EventSelection)],
    ) -> Result<(), ListenerError> {
        for (resource, events) in selection {
            self.start(*resource, events.clone()).await?;
        }
        Ok(())
    }

    /// Cancels every live subscription and returns the remaining count.
    pub async fn shutdown(&mut self) -> usize {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel(self.source.as_ref()).await;
            self.active = self.active.saturating_sub(1);
        }
        self.active
    }
}

/// Forwards every event of `resource` matched by `selection`.
async fn pump(
    mut receiver: broadcast::Receiver<PlatformEvent>,
    resource: Resource,
    selection: EventSelection,
    forwarder: Arc<dyn Forward>,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if event.resource != resource || !selection.matches(&event.event) {
                    continue;
                }

                let forwarder = Arc::clone(&forwarder);
                tokio::spawn(async move {
                    forwarder.forward(&event).await;
                });
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("{resource} listener fell behind, {skipped} events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
