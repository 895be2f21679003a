use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use multidash_core::{DataSourceAdapter, DataSourceError};
use multidash_sources::{MqttAdapter, WebSocketAdapter, MAX_RECONNECT_ATTEMPTS};
use multidash_types::{MqttSourceConfig, Transformer, WebSocketSourceConfig};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

async fn ticker(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        for seq in 0..3 {
            let frame = json!({"seq": seq}).to_string();
            if socket.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        // Keep the socket open until the client leaves
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn silent(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

#[tokio::test]
async fn websocket_fetch_returns_next_message() {
    let addr = serve(Router::new().route("/ticks", get(ticker))).await;
    let adapter = WebSocketAdapter::new(
        WebSocketSourceConfig::new(format!("ws://{}/ticks", addr)),
        Some(Transformer::new(|v| Ok(json!({"n": v["seq"]})))),
    )
    .unwrap();

    let first = adapter.fetch().await.unwrap();
    assert_eq!(first, json!({"n": 0}));

    // Remaining frames land in the buffer
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(adapter.latest_message(), Some(json!({"n": 2})));
    assert!(adapter.is_connected());

    adapter.cleanup();
    assert!(adapter.latest_message().is_none());
}

#[tokio::test]
async fn websocket_times_out_without_messages() {
    let addr = serve(Router::new().route("/quiet", get(silent))).await;
    let adapter = WebSocketAdapter::new(WebSocketSourceConfig::new(format!("ws://{}/quiet", addr)), None)
        .unwrap()
        .with_fetch_timeout(Duration::from_millis(300));

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err, DataSourceError::Timeout("WebSocket connection timeout".into()));
}

#[tokio::test]
async fn websocket_connection_refused_without_reconnect() {
    let adapter = WebSocketAdapter::new(WebSocketSourceConfig::new("ws://127.0.0.1:1/none"), None)
        .unwrap()
        .with_fetch_timeout(Duration::from_secs(5));

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err.code(), "FETCH_ERROR");
    assert!(err.message().starts_with("WebSocket connection failed"));
}

#[tokio::test]
async fn websocket_send_reaches_server() {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let router = Router::new()
        .route(
            "/echo",
            get(|ws: WebSocketUpgrade, State(tx): State<mpsc::UnboundedSender<String>>| async move {
                ws.on_upgrade(move |mut socket: WebSocket| async move {
                    let _ = socket.send(Message::Text("{\"ready\":true}".into())).await;
                    while let Some(Ok(Message::Text(text))) = socket.recv().await {
                        let _ = tx.send(text);
                    }
                })
            }),
        )
        .with_state(tx);
    let addr = serve(router).await;

    let adapter =
        WebSocketAdapter::new(WebSocketSourceConfig::new(format!("ws://{}/echo", addr)), None).unwrap();
    assert_eq!(adapter.fetch().await.unwrap(), json!({"ready": true}));

    adapter.send(&json!({"cmd": "reset"})).unwrap();
    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(serde_json::from_str::<Value>(&received).unwrap(), json!({"cmd": "reset"}));
}

/// Numbers each connection; drops the first `drops` right after greeting
async fn flaky(ws: WebSocketUpgrade, State((count, drops)): State<(Arc<AtomicUsize>, usize)>) -> Response {
    ws.on_upgrade(move |mut socket: WebSocket| async move {
        let conn = count.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = socket.send(Message::Text(json!({"conn": conn}).to_string())).await;
        if conn <= drops {
            return;
        }
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn serve_flaky(drops: usize) -> (String, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/flaky", get(flaky))
        .with_state((count.clone(), drops));
    (format!("ws://{}/flaky", serve(router).await), count)
}

fn reconnecting(url: String) -> WebSocketSourceConfig {
    let mut config = WebSocketSourceConfig::new(url);
    config.reconnect = Some(true);
    config.reconnect_interval = Some(20);
    config
}

#[tokio::test]
async fn websocket_reconnects_after_drops() {
    // More drops than the attempt limit: only works if attempts reset on connect
    let (url, count) = serve_flaky(MAX_RECONNECT_ATTEMPTS as usize + 1).await;
    let adapter = WebSocketAdapter::new(reconnecting(url), None).unwrap();

    assert_eq!(adapter.fetch().await.unwrap(), json!({"conn": 1}));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count.load(Ordering::SeqCst), MAX_RECONNECT_ATTEMPTS as usize + 2);
    assert_eq!(adapter.latest_message(), Some(json!({"conn": 7})));
    assert!(adapter.is_connected());
    adapter.cleanup();
}

#[tokio::test]
async fn websocket_drop_without_reconnect_stays_closed() {
    let (url, count) = serve_flaky(usize::MAX).await;
    let adapter = WebSocketAdapter::new(WebSocketSourceConfig::new(url), None)
        .unwrap()
        .with_fetch_timeout(Duration::from_secs(5));

    assert_eq!(adapter.fetch().await.unwrap(), json!({"conn": 1}));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!adapter.is_connected());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn websocket_close_without_reconnect_fails_fetch() {
    let router = Router::new().route(
        "/closing",
        get(|ws: WebSocketUpgrade| async move { ws.on_upgrade(|_socket: WebSocket| async {}) }),
    );
    let addr = serve(router).await;
    let adapter = WebSocketAdapter::new(WebSocketSourceConfig::new(format!("ws://{}/closing", addr)), None)
        .unwrap()
        .with_fetch_timeout(Duration::from_secs(5));

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err, DataSourceError::NotConnected("WebSocket disconnected".into()));
}

#[tokio::test]
async fn websocket_gives_up_after_max_attempts() {
    let adapter = WebSocketAdapter::new(reconnecting("ws://127.0.0.1:1/none".into()), None)
        .unwrap()
        .with_fetch_timeout(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err.code(), "FETCH_ERROR");
    assert!(err.message().starts_with("WebSocket connection failed"));
    // Five 20ms waits, well short of the fetch timeout
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[derive(Clone)]
struct Bridge {
    frames: mpsc::UnboundedSender<Value>,
    reply: Value,
}

async fn mqtt_bridge(ws: WebSocketUpgrade, State(bridge): State<Bridge>) -> Response {
    ws.on_upgrade(move |mut socket: WebSocket| async move {
        while let Some(Ok(message)) = socket.recv().await {
            let Message::Text(text) = message else {
                continue;
            };
            let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            let subscribing = frame["action"] == "subscribe";
            let _ = bridge.frames.send(frame);
            if subscribing {
                let _ = socket
                    .send(Message::Text(json!({"type": "subscribed"}).to_string()))
                    .await;
                let _ = socket.send(Message::Text(bridge.reply.to_string())).await;
            }
        }
    })
}

async fn start_bridge(reply: Value) -> (String, mpsc::UnboundedReceiver<Value>) {
    let (frames, rx) = mpsc::unbounded_channel();
    let router = Router::new()
        .route("/api/datasource/mqtt/ws", get(mqtt_bridge))
        .with_state(Bridge { frames, reply });
    (format!("http://{}", serve(router).await), rx)
}

async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn mqtt_handshake_fetch_publish_disconnect() {
    let (backend, mut frames) =
        start_bridge(json!({"type": "data", "payload": {"temp": 21.5}})).await;

    let mut config = MqttSourceConfig::new("mqtt://broker.local", "plant/line1/temp");
    config.username = Some("operator".into());
    let adapter = MqttAdapter::new(config, None, Client::new(), &backend).unwrap();

    assert_eq!(adapter.fetch().await.unwrap(), json!({"temp": 21.5}));

    let subscribe = next_frame(&mut frames).await;
    assert_eq!(subscribe["action"], "subscribe");
    assert_eq!(subscribe["config"]["topic"], "plant/line1/temp");
    assert_eq!(subscribe["config"]["username"], "operator");
    assert_eq!(subscribe["config"]["port"], 1883);

    adapter.publish(&json!({"setpoint": 20})).unwrap();
    let publish = next_frame(&mut frames).await;
    assert_eq!(publish["action"], "publish");
    assert_eq!(publish["message"], "{\"setpoint\":20}");
    assert_eq!(publish["qos"], 0);
    assert_eq!(publish["retain"], false);

    adapter.disconnect();
    let unsubscribe = next_frame(&mut frames).await;
    assert_eq!(unsubscribe, json!({"action": "unsubscribe", "topic": "plant/line1/temp"}));
    assert!(!adapter.is_connected());
}

#[tokio::test]
async fn mqtt_error_frame_without_data() {
    let (backend, _frames) =
        start_bridge(json!({"type": "error", "error": "Connection refused: not authorized"})).await;
    let adapter =
        MqttAdapter::new(MqttSourceConfig::new("mqtt://broker.local", "t"), None, Client::new(), &backend)
            .unwrap();

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err.message(), "MQTT Error: Connection refused: not authorized");
}

#[tokio::test]
async fn mqtt_listeners_receive_pushed_data() {
    let (backend, _frames) = start_bridge(json!({"type": "data", "payload": 7})).await;
    let adapter = MqttAdapter::new(
        MqttSourceConfig::new("mqtt://broker.local", "t"),
        Some(Transformer::new(|v| Ok(json!(v.as_i64().unwrap_or(0) * 10)))),
        Client::new(),
        &backend,
    )
    .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.subscribe(move |value| {
        let _ = tx.send(value.clone());
    });

    assert_eq!(adapter.fetch().await.unwrap(), json!(70));
    assert_eq!(rx.recv().await, Some(json!(70)));
}
