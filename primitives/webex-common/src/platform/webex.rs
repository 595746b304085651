//! REST + WebSocket client for the messaging platform.
//!
//! A single device WebSocket carries the events of every resource. It is
//! opened by the first [`EventSource::listen`] call and torn down (device
//! included) once the last resource stops listening.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{
    net::TcpStream,
    sync::{Mutex, broadcast, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use uuid::Uuid;

use super::{EventSource, Person, PlatformEvent, translate_activity};
use crate::catalog::Resource;
use crate::error::PlatformError;

/// Public REST API.
pub const DEFAULT_API_URL: &str = "https://webexapis.com/v1";

/// Device registration service that hands out WebSocket URLs.
pub const DEFAULT_DEVICE_URL: &str = "https://wdm-a.wbx2.com/wdm/api/v1/devices";

const EVENT_CHANNEL_CAPACITY: usize = 256;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Registered device as returned by the registration service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Device {
    url: String,
    web_socket_url: String,
}

/// Live realtime connection.
struct Connection {
    device: Device,
    shutdown: oneshot::Sender<()>,
    reader: JoinHandle<()>,
    listening: HashSet<Resource>,
}

/// Platform client bound to one access token.
pub struct WebexClient {
    http: Client,
    token: String,
    api_url: String,
    device_url: String,
    events: broadcast::Sender<PlatformEvent>,
    connection: Mutex<Option<Connection>>,
}

impl WebexClient {
    /// Creates a client against the public platform endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_urls(token, DEFAULT_API_URL, DEFAULT_DEVICE_URL)
    }

    /// Creates a client against custom endpoints.
    pub fn with_urls(
        token: impl Into<String>,
        api_url: impl Into<String>,
        device_url: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: Client::new(),
            token: token.into(),
            api_url: api_url.into(),
            device_url: device_url.into(),
            events,
            connection: Mutex::new(None),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn register_device(&self) -> Result<Device, PlatformError> {
        let body = json!({
            "deviceName": "webex-forwarder",
            "deviceType": "DESKTOP",
            "localizedModel": "rust",
            "model": "rust",
            "name": "webex-forwarder",
            "systemName": std::env::consts::OS,
            "systemVersion": env!("CARGO_PKG_VERSION"),
        });

        let response = self
            .http
            .post(&self.device_url)
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlatformError::Device(format!(
                "registration returned status {}",
                response.status()
            )));
        }

        Ok(response.json::<Device>().await?)
    }

    async fn delete_device(&self, device_url: &str) {
        let result = self
            .http
            .delete(device_url)
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!("failed to delete device {device_url}: {e}");
        }
    }

    async fn open_socket(&self, device: &Device) -> Result<Socket, PlatformError> {
        let mut url = Url::parse(&device.web_socket_url)
            .map_err(|e| PlatformError::Device(format!("invalid webSocketUrl: {e}")))?;
        url.query_pairs_mut()
            .append_pair("outboundWireFormat", "text")
            .append_pair("bufferStates", "true")
            .append_pair("aliasHttpStatus", "true");

        let (mut socket, _) = connect_async(url.as_str()).await?;

        let authorization = json!({
            "id": Uuid::new_v4().to_string(),
            "type": "authorization",
            "data": { "token": self.bearer() },
        });
        socket.send(Message::Text(authorization.to_string())).await?;

        Ok(socket)
    }

    async fn connect(&self) -> Result<Connection, PlatformError> {
        let device = self.register_device().await?;

        let socket = match self.open_socket(&device).await {
            Ok(socket) => socket,
            Err(e) => {
                self.delete_device(&device.url).await;
                return Err(e);
            }
        };

        let (shutdown, shutdown_rx) = oneshot::channel();
        let reader = tokio::spawn(read_frames(socket, self.events.clone(), shutdown_rx));
        tracing::debug!(device = %device.url, "realtime connection established");

        Ok(Connection {
            device,
            shutdown,
            reader,
            listening: HashSet::new(),
        })
    }

    async fn disconnect(&self, connection: Connection) {
        let Connection {
            device,
            shutdown,
            reader,
            ..
        } = connection;

        let _ = shutdown.send(());
        if tokio::time::timeout(CLOSE_TIMEOUT, reader).await.is_err() {
            tracing::warn!("realtime connection did not close in time");
        }

        self.delete_device(&device.url).await;
        tracing::debug!(device = %device.url, "realtime connection closed");
    }
}

#[async_trait]
impl EventSource for WebexClient {
    async fn whoami(&self) -> Result<Person, PlatformError> {
        let url = format!("{}/people/me", self.api_url.trim_end_matches('/'));

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("identity lookup failed: {e}");
                PlatformError::NotAuthenticated
            })?;

        if !response.status().is_success() {
            tracing::debug!("identity lookup returned status {}", response.status());
            return Err(PlatformError::NotAuthenticated);
        }

        response
            .json::<Person>()
            .await
            .map_err(|_| PlatformError::NotAuthenticated)
    }

    async fn listen(
        &self,
        resource: Resource,
    ) -> Result<broadcast::Receiver<PlatformEvent>, PlatformError> {
        // Subscribe before the reader starts so no early frame is missed.
        let receiver = self.events.subscribe();
        let mut guard = self.connection.lock().await;

        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        if let Some(connection) = guard.as_mut() {
            connection.listening.insert(resource);
        }

        Ok(receiver)
    }

    async fn stop_listening(&self, resource: Resource) {
        let mut guard = self.connection.lock().await;

        let Some(connection) = guard.as_mut() else {
            return;
        };
        connection.listening.remove(&resource);

        if !connection.listening.is_empty() {
            return;
        }

        if let Some(connection) = guard.take() {
            self.disconnect(connection).await;
        }
    }
}

/// Pumps frames off the socket until shutdown or disconnect.
async fn read_frames(
    mut socket: Socket,
    events: broadcast::Sender<PlatformEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = socket.close(None).await;
                break;
            }

            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(ack) = handle_frame(&text, &events) {
                        if let Err(e) = socket.send(Message::Text(ack)).await {
                            tracing::warn!("failed to acknowledge frame: {e}");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::warn!("realtime connection closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("realtime connection error: {e}");
                    break;
                }
            }
        }
    }
}

/// Publishes the event carried by a text frame, if any, and returns the
/// acknowledgement to send back.
fn handle_frame(text: &str, events: &broadcast::Sender<PlatformEvent>) -> Option<String> {
    let frame: Value = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!("ignoring malformed frame: {e}");
            return None;
        }
    };

    let event_type = frame.pointer("/data/eventType").and_then(Value::as_str);
    let activity = frame
        .pointer("/data/activity")
        .filter(|_| event_type == Some("conversation.activity"));

    if let Some(activity) = activity {
        match translate_activity(activity) {
            // No receivers just means nothing is listening yet.
            Some(event) => {
                let _ = events.send(event);
            }
            None => {
                let verb = activity
                    .get("verb")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                tracing::debug!(verb, "ignoring activity");
            }
        }
    }

    frame
        .get("id")
        .and_then(Value::as_str)
        .map(|id| json!({ "type": "ack", "messageId": id }).to_string())
}
