//! MQTT subscriptions through the backend WebSocket bridge
//!
//! Browsers and CLIs cannot speak MQTT directly to most brokers, so the
//! backend exposes a WebSocket at `/api/datasource/mqtt/ws`. The client sends
//! `{action: subscribe|unsubscribe|publish, ...}` frames and receives
//! `{type: data|error|subscribed, ...}` frames.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::source_configs::DEFAULT_MQTT_PORT;
use multidash_types::{DataSourceType, MqttSourceConfig, Transformer};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::http;

/// How long the first fetch waits for the bridge to deliver data
pub const INITIAL_DATA_WAIT: Duration = Duration::from_secs(1);

/// Callback invoked with every transformed payload
pub type MqttListener = Box<dyn Fn(&Value) + Send + Sync>;

/// State written by the bridge task
struct Shared {
    latest: Mutex<Option<Value>>,
    last_error: Mutex<Option<String>>,
    listeners: Mutex<HashMap<String, MqttListener>>,
    /// Bumped on every data or error frame
    revision: watch::Sender<u64>,
    transformer: Option<Transformer>,
}

impl Shared {
    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn handle_frame(&self, text: &str, topic: &str) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Failed to parse MQTT bridge message: {}", e);
                return;
            }
        };

        match frame.get("type").and_then(Value::as_str) {
            Some("data") => {
                let payload = frame.get("payload").cloned().unwrap_or(Value::Null);
                if let Ok(mut latest) = self.latest.lock() {
                    *latest = Some(payload.clone());
                }
                match apply_transform(self.transformer.as_ref(), payload) {
                    Ok(data) => {
                        if let Ok(listeners) = self.listeners.lock() {
                            for listener in listeners.values() {
                                listener(&data);
                            }
                        }
                    }
                    Err(e) => log::warn!("MQTT payload on {} dropped: {}", topic, e),
                }
                self.bump();
            }
            Some("error") => {
                let error = match frame.get("error") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "Unknown MQTT error".to_string(),
                };
                log::error!("MQTT error on {}: {}", topic, error);
                if let Ok(mut last) = self.last_error.lock() {
                    *last = Some(error);
                }
                self.bump();
            }
            Some("subscribed") => log::info!("Subscribed to MQTT topic: {}", topic),
            other => log::debug!("Ignoring MQTT bridge frame type {:?}", other),
        }
    }
}

struct BridgeConnection {
    outgoing: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl BridgeConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.task.is_finished()
    }
}

pub struct MqttAdapter {
    config: MqttSourceConfig,
    client_id: String,
    bridge_url: String,
    test_url: String,
    client: Client,
    initial_wait: Duration,
    shared: Arc<Shared>,
    connection: Mutex<Option<BridgeConnection>>,
}

impl MqttAdapter {
    pub fn new(
        config: MqttSourceConfig,
        transformer: Option<Transformer>,
        client: Client,
        backend_url: &str,
    ) -> Result<Self, DataSourceError> {
        if config.broker_url.trim().is_empty() {
            return Err(DataSourceError::validation("MQTT broker URL is required"));
        }
        if config.topic.trim().is_empty() {
            return Err(DataSourceError::validation("MQTT topic is required"));
        }

        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("dashboard_{}", chrono::Utc::now().timestamp_millis()));
        let (revision, _) = watch::channel(0);

        Ok(Self {
            client_id,
            bridge_url: http::to_ws_scheme(&http::join_path(backend_url, "api/datasource/mqtt/ws")),
            test_url: http::join_path(backend_url, "api/datasource/mqtt/test"),
            client,
            initial_wait: INITIAL_DATA_WAIT,
            shared: Arc::new(Shared {
                latest: Mutex::new(None),
                last_error: Mutex::new(None),
                listeners: Mutex::new(HashMap::new()),
                revision,
                transformer,
            }),
            connection: Mutex::new(None),
            config,
        })
    }

    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn bridge_url(&self) -> &str {
        &self.bridge_url
    }

    fn port(&self) -> u16 {
        self.config.port.unwrap_or(DEFAULT_MQTT_PORT)
    }

    fn qos(&self) -> u8 {
        self.config.qos.map(|q| q.level()).unwrap_or(0)
    }

    /// The `subscribe` frame sent right after the bridge socket opens
    pub fn subscribe_frame(&self) -> Value {
        let mut config = Map::new();
        config.insert("brokerUrl".into(), json!(self.config.broker_url));
        config.insert("port".into(), json!(self.port()));
        config.insert("topic".into(), json!(self.config.topic));
        config.insert("clientId".into(), json!(self.client_id));
        if let Some(username) = &self.config.username {
            config.insert("username".into(), json!(username));
        }
        if let Some(password) = &self.config.password {
            config.insert("password".into(), json!(password));
        }
        config.insert("qos".into(), json!(self.qos()));
        config.insert("clean".into(), json!(self.config.clean != Some(false)));
        json!({"action": "subscribe", "config": config})
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|c| c.as_ref().map(BridgeConnection::is_open).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Open the bridge socket and subscribe to the configured topic
    pub async fn connect(&self) -> Result<(), DataSourceError> {
        let (stream, _) = connect_async(self.bridge_url.as_str()).await.map_err(|e| {
            log::error!("Failed to connect to MQTT bridge {}: {}", self.bridge_url, e);
            DataSourceError::fetch(format!("MQTT bridge connection failed: {}", e))
        })?;
        log::info!("MQTT bridge connected: {}", self.bridge_url);

        let (mut write, mut read) = stream.split();
        write
            .send(Message::Text(self.subscribe_frame().to_string()))
            .await
            .map_err(|e| DataSourceError::fetch(format!("MQTT subscribe failed: {}", e)))?;

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let open = Arc::new(AtomicBool::new(true));
        let task_open = open.clone();
        let shared = self.shared.clone();
        let topic = self.config.topic.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = outgoing_rx.recv() => match message {
                        Some(message) => {
                            let closing = matches!(message, Message::Close(_));
                            if let Err(e) = write.send(message).await {
                                log::warn!("MQTT bridge send failed: {}", e);
                                break;
                            }
                            if closing {
                                break;
                            }
                        }
                        None => break,
                    },
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => shared.handle_frame(&text, &topic),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::error!("MQTT bridge error: {}", e);
                            break;
                        }
                    }
                }
            }
            task_open.store(false, Ordering::SeqCst);
            log::info!("MQTT bridge connection closed");
        });

        if let Ok(mut slot) = self.connection.lock() {
            *slot = Some(BridgeConnection {
                outgoing,
                open,
                task,
            });
        }
        Ok(())
    }

    /// Send `unsubscribe` and close the bridge socket
    pub fn disconnect(&self) {
        let conn = self.connection.lock().ok().and_then(|mut c| c.take());
        if let Some(conn) = conn {
            let frame = json!({"action": "unsubscribe", "topic": self.config.topic});
            let _ = conn.outgoing.send(Message::Text(frame.to_string()));
            let _ = conn.outgoing.send(Message::Close(None));
            log::debug!("MQTT unsubscribed from {}", self.config.topic);
        }
    }

    /// Register a callback for every transformed payload; returns its id
    pub fn subscribe<F>(&self, callback: F) -> String
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = uuid::Uuid::new_v4().to_string();
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.insert(id.clone(), Box::new(callback));
        }
        id
    }

    /// Remove a callback; returns false when the id was unknown
    pub fn unsubscribe(&self, listener_id: &str) -> bool {
        self.shared
            .listeners
            .lock()
            .map(|mut l| l.remove(listener_id).is_some())
            .unwrap_or(false)
    }

    /// Publish a JSON message to the configured topic
    pub fn publish(&self, message: &Value) -> Result<(), DataSourceError> {
        let not_connected = || DataSourceError::NotConnected("MQTT not connected".into());
        let guard = self.connection.lock().map_err(|_| not_connected())?;
        let conn = guard
            .as_ref()
            .filter(|c| c.is_open())
            .ok_or_else(not_connected)?;

        let frame = json!({
            "action": "publish",
            "topic": self.config.topic,
            "message": message.to_string(),
            "qos": self.qos(),
            "retain": self.config.retain.unwrap_or(false),
        });
        conn.outgoing
            .send(Message::Text(frame.to_string()))
            .map_err(|_| not_connected())
    }

    /// Ask the backend whether the broker accepts a connection
    pub async fn test_connection(&self) -> bool {
        let mut body = json!({
            "brokerUrl": self.config.broker_url,
            "port": self.port(),
        });
        if let Some(username) = &self.config.username {
            body["username"] = json!(username);
        }
        if let Some(password) = &self.config.password {
            body["password"] = json!(password);
        }

        let result = async {
            let response = self
                .client
                .post(&self.test_url)
                .json(&body)
                .send()
                .await
                .map_err(http::transport_error)?;
            http::read_json(response).await
        }
        .await;

        match result {
            Ok(result) => result.get("success").and_then(Value::as_bool) == Some(true),
            Err(e) => {
                log::error!("MQTT connection test failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl DataSourceAdapter for MqttAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Mqtt
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        if !self.is_connected() {
            let mut revision = self.shared.revision.subscribe();
            self.connect().await?;
            // Returns early as soon as the bridge delivers something
            let _ = tokio::time::timeout(self.initial_wait, revision.changed()).await;
        }

        let latest = self.shared.latest.lock().ok().and_then(|l| l.clone());
        if latest.is_none() {
            let error = self.shared.last_error.lock().ok().and_then(|e| e.clone());
            if let Some(error) = error {
                return Err(DataSourceError::fetch(format!("MQTT Error: {}", error)));
            }
        }
        apply_transform(self.shared.transformer.as_ref(), latest.unwrap_or(Value::Null))
    }

    fn cleanup(&self) {
        self.disconnect();
    }
}

impl Drop for MqttAdapter {
    fn drop(&mut self) {
        self.disconnect();
    }
}
