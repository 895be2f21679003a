//! WebSocket streaming data source
//!
//! A background task owns the socket. It keeps the last few transformed
//! messages and broadcasts every new one, so `fetch()` simply waits for the
//! next broadcast.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use multidash_core::{apply_transform, DataSourceAdapter, DataSourceError};
use multidash_types::{DataSourceType, Transformer, WebSocketSourceConfig};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;

/// Messages kept for `latest_message()`
pub const MESSAGE_BUFFER_SIZE: usize = 10;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

type Event = Result<Value, DataSourceError>;

/// State shared between the adapter and its socket task
struct Shared {
    messages: Mutex<VecDeque<Value>>,
    events: broadcast::Sender<Event>,
    connected: AtomicBool,
    transformer: Option<Transformer>,
}

impl Shared {
    fn handle_payload(&self, raw: &[u8]) {
        let event = serde_json::from_slice::<Value>(raw)
            .map_err(|e| DataSourceError::fetch(format!("Invalid WebSocket message: {}", e)))
            .and_then(|data| apply_transform(self.transformer.as_ref(), data));

        match &event {
            Ok(value) => {
                if let Ok(mut messages) = self.messages.lock() {
                    messages.push_back(value.clone());
                    while messages.len() > MESSAGE_BUFFER_SIZE {
                        messages.pop_front();
                    }
                }
            }
            Err(e) => log::warn!("WebSocket message parsing error: {}", e),
        }
        // No receivers just means nobody is fetching right now
        let _ = self.events.send(event);
    }
}

/// Handle to a running socket task
struct Connection {
    outgoing: mpsc::UnboundedSender<Message>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct WebSocketAdapter {
    config: WebSocketSourceConfig,
    fetch_timeout: Duration,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
}

impl WebSocketAdapter {
    pub fn new(
        config: WebSocketSourceConfig,
        transformer: Option<Transformer>,
    ) -> Result<Self, DataSourceError> {
        if config.url.trim().is_empty() {
            return Err(DataSourceError::validation("WebSocket adapter requires a URL"));
        }
        if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
            return Err(DataSourceError::validation(
                "WebSocket URL must start with ws:// or wss://",
            ));
        }

        let (events, _) = broadcast::channel(MESSAGE_BUFFER_SIZE * 4);
        Ok(Self {
            config,
            fetch_timeout: FETCH_TIMEOUT,
            shared: Arc::new(Shared {
                messages: Mutex::new(VecDeque::with_capacity(MESSAGE_BUFFER_SIZE)),
                events,
                connected: AtomicBool::new(false),
                transformer,
            }),
            connection: Mutex::new(None),
        })
    }

    /// Override how long `fetch()` waits for the next message
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Most recent transformed message, if any arrived
    pub fn latest_message(&self) -> Option<Value> {
        self.shared
            .messages
            .lock()
            .ok()
            .and_then(|m| m.back().cloned())
    }

    /// Number of buffered messages
    pub fn buffered(&self) -> usize {
        self.shared.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Send a JSON value to the server
    pub fn send(&self, data: &Value) -> Result<(), DataSourceError> {
        let not_connected = || DataSourceError::NotConnected("WebSocket is not connected".into());
        if !self.is_connected() {
            return Err(not_connected());
        }
        let guard = self.connection.lock().map_err(|_| not_connected())?;
        let conn = guard.as_ref().ok_or_else(not_connected)?;
        conn.outgoing
            .send(Message::Text(data.to_string()))
            .map_err(|_| not_connected())
    }

    /// Start the socket task unless one is already running
    fn ensure_connected(&self) -> Result<(), DataSourceError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|e| DataSourceError::fetch(format!("Lock poisoned: {}", e)))?;
        if let Some(conn) = guard.as_ref() {
            if !conn.task.is_finished() {
                return Ok(());
            }
        }

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_socket(
            self.config.clone(),
            self.shared.clone(),
            outgoing_rx,
            shutdown_rx,
        ));
        *guard = Some(Connection {
            outgoing,
            shutdown,
            task,
        });
        Ok(())
    }
}

#[async_trait]
impl DataSourceAdapter for WebSocketAdapter {
    fn source_type(&self) -> DataSourceType {
        DataSourceType::Websocket
    }

    async fn fetch(&self) -> Result<Value, DataSourceError> {
        // Subscribe before connecting so the first message cannot be missed
        let mut events = self.shared.events.subscribe();
        self.ensure_connected()?;

        let next = async {
            loop {
                match events.recv().await {
                    Ok(event) => return event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::trace!("WebSocket fetch skipped {} messages", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(DataSourceError::NotConnected(
                            "WebSocket is not connected".into(),
                        ))
                    }
                }
            }
        };

        tokio::time::timeout(self.fetch_timeout, next)
            .await
            .map_err(|_| DataSourceError::Timeout("WebSocket connection timeout".into()))?
    }

    fn cleanup(&self) {
        let conn = self.connection.lock().ok().and_then(|mut c| c.take());
        if let Some(conn) = conn {
            log::debug!("Closing WebSocket {}", self.config.url);
            let _ = conn.shutdown.send(true);
        }
        if let Ok(mut messages) = self.shared.messages.lock() {
            messages.clear();
        }
    }
}

impl Drop for WebSocketAdapter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn build_request(
    config: &WebSocketSourceConfig,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, String> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| e.to_string())?;
    if let Some(protocols) = config.protocols.as_ref().filter(|p| !p.is_empty()) {
        let value = HeaderValue::from_str(&protocols.join(", ")).map_err(|e| e.to_string())?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }
    Ok(request)
}

/// Socket task: connect, pump messages, reconnect when configured
async fn run_socket(
    config: WebSocketSourceConfig,
    shared: Arc<Shared>,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempts = 0u32;

    loop {
        let mut failure = DataSourceError::NotConnected("WebSocket disconnected".into());

        let request = match build_request(&config) {
            Ok(request) => request,
            Err(e) => {
                let _ = shared
                    .events
                    .send(Err(DataSourceError::fetch(format!("Invalid WebSocket request: {}", e))));
                return;
            }
        };

        let connected = tokio::select! {
            _ = shutdown.changed() => return,
            result = connect_async(request) => result,
        };

        match connected {
            Ok((stream, _)) => {
                log::info!("WebSocket connected: {}", config.url);
                attempts = 0;
                shared.connected.store(true, Ordering::SeqCst);
                let (mut write, mut read) = stream.split();

                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            shared.connected.store(false, Ordering::SeqCst);
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                        Some(message) = outgoing.recv() => {
                            if let Err(e) = write.send(message).await {
                                log::warn!("WebSocket send failed: {}", e);
                                break;
                            }
                        }
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => shared.handle_payload(text.as_bytes()),
                            Some(Ok(Message::Binary(bytes))) => shared.handle_payload(&bytes),
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                log::warn!("WebSocket error on {}: {}", config.url, e);
                                break;
                            }
                        }
                    }
                }
                shared.connected.store(false, Ordering::SeqCst);
                log::info!("WebSocket disconnected: {}", config.url);
            }
            Err(e) => {
                log::warn!("WebSocket connection to {} failed: {}", config.url, e);
                failure = DataSourceError::fetch(format!("WebSocket connection failed: {}", e));
            }
        }

        if !config.reconnect_enabled() || attempts >= MAX_RECONNECT_ATTEMPTS {
            let _ = shared.events.send(Err(failure));
            return;
        }

        attempts += 1;
        let delay = config.reconnect_interval_ms();
        log::info!("Reconnecting in {}ms (attempt {})", delay, attempts);
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
        }
    }
}
