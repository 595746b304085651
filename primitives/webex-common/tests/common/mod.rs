//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use tokio::sync::{broadcast, mpsc};
use webex_common::{
    EventSource, Forward, ForwardOutcome, Person, PlatformError, PlatformEvent, Resource,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// In-memory event source. Events are injected through `emit`.
pub struct MockSource {
    events: broadcast::Sender<PlatformEvent>,
    person: Option<Person>,
    fail_on: Option<Resource>,
    pub listened: Mutex<Vec<Resource>>,
    pub stopped: Mutex<Vec<Resource>>,
}

impl MockSource {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            person: Some(Person {
                id: "person-1".into(),
                display_name: "Alice Example".into(),
                emails: vec!["alice@example.com".into()],
            }),
            fail_on: None,
            listened: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_credential() -> Self {
        Self {
            person: None,
            ..Self::new()
        }
    }

    pub fn failing_on(resource: Resource) -> Self {
        Self {
            fail_on: Some(resource),
            ..Self::new()
        }
    }

    pub fn emit(&self, event: PlatformEvent) {
        self.events.send(event).unwrap();
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn whoami(&self) -> Result<Person, PlatformError> {
        self.person.clone().ok_or(PlatformError::NotAuthenticated)
    }

    async fn listen(
        &self,
        resource: Resource,
    ) -> Result<broadcast::Receiver<PlatformEvent>, PlatformError> {
        if self.fail_on == Some(resource) {
            return Err(PlatformError::ConnectionClosed);
        }
        self.listened.lock().unwrap().push(resource);
        Ok(self.events.subscribe())
    }

    async fn stop_listening(&self, resource: Resource) {
        self.stopped.lock().unwrap().push(resource);
    }
}

/// Forwarder that hands every event to the test.
pub struct RecordingForwarder {
    tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl RecordingForwarder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlatformEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Forward for RecordingForwarder {
    async fn forward(&self, event: &PlatformEvent) -> ForwardOutcome {
        let _ = self.tx.send(event.clone());
        ForwardOutcome::Delivered(200)
    }
}

/// A request captured by the forward target.
#[derive(Debug)]
pub struct Received {
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
    pub body: Bytes,
}

async fn record(
    State(tx): State<mpsc::UnboundedSender<Received>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let _ = tx.send(Received {
        content_type,
        content_length,
        body,
    });

    StatusCode::ACCEPTED
}

/// Starts a forward target on an ephemeral port.
pub async fn spawn_target() -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/", post(record)).with_state(tx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, rx)
}
