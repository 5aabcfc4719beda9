#![allow(dead_code)]

use std::sync::{Arc, Weak};
use std::time::Duration;

use control_hub_core::{
    ControlHub, HubConfig, HubError, MediaItem, PlayerController, PlayerObserver, PlayerState,
    ProgressionMode,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Request {
    State(PlayerState),
    Seek(f64),
    Speed(f64),
    Volume(f64),
    Mute(bool),
    Progression(ProgressionMode),
    Append(String),
    InsertAfter(String, u32),
    Select(u32),
    Remove(u32),
    Clear,
}

/// Player double: records every control call and answers asynchronously
/// with the notifications a real player would emit.
pub struct TestPlayer {
    tx: mpsc::UnboundedSender<Request>,
    calls: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl TestPlayer {
    fn send(&self, call: String, request: Request) {
        self.calls.lock().push(call);
        let _ = self.tx.send(request);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl PlayerController for TestPlayer {
    fn play(&self) {
        self.send("play".into(), Request::State(PlayerState::Playing));
    }
    fn pause(&self) {
        self.send("pause".into(), Request::State(PlayerState::Paused));
    }
    fn stop(&self) {
        self.send("stop".into(), Request::State(PlayerState::Stopped));
    }
    fn seek(&self, position: f64) {
        self.send(format!("seek {}", position), Request::Seek(position));
    }
    fn set_speed(&self, speed: f64) {
        self.send(format!("speed {}", speed), Request::Speed(speed));
    }
    fn set_volume(&self, volume: f64) {
        self.send(format!("volume {}", volume), Request::Volume(volume));
    }
    fn set_mute(&self, mute: bool) {
        self.send(format!("mute {}", mute), Request::Mute(mute));
    }
    fn set_queue_progression(&self, mode: ProgressionMode) {
        self.send(format!("progression {}", mode), Request::Progression(mode));
    }
    fn queue_append(&self, uri: &str) {
        self.send(format!("append {}", uri), Request::Append(uri.to_string()));
    }
    fn queue_insert_after(&self, uri: &str, after_id: u32) {
        self.send(
            format!("insert {} after {}", uri, after_id),
            Request::InsertAfter(uri.to_string(), after_id),
        );
    }
    fn queue_select(&self, id: u32) {
        self.send(format!("select {}", id), Request::Select(id));
    }
    fn queue_remove(&self, id: u32) {
        self.send(format!("remove {}", id), Request::Remove(id));
    }
    fn queue_clear(&self) {
        self.send("clear".into(), Request::Clear);
    }
    fn report_error(&self, error: &HubError) {
        self.errors.lock().push(error.code().to_string());
    }
    fn player_version(&self) -> String {
        "test".to_string()
    }
}

/// Applies requests in order and notifies the hub, like a player's signal loop.
async fn simulate(mut rx: mpsc::UnboundedReceiver<Request>, hub: Weak<ControlHub>) {
    let mut queue: Vec<MediaItem> = Vec::new();
    let mut next_id = 1;

    while let Some(request) = rx.recv().await {
        let Some(hub) = hub.upgrade() else { break };
        match request {
            Request::State(state) => hub.state_changed(state),
            Request::Seek(position) => hub.position_changed(position),
            Request::Speed(speed) => hub.speed_changed(speed),
            Request::Volume(volume) => hub.volume_changed(volume),
            Request::Mute(mute) => hub.mute_changed(mute),
            Request::Progression(mode) => hub.queue_progression_changed(mode),
            Request::Append(uri) => {
                let item = new_item(&mut next_id, uri);
                queue.push(item.clone());
                hub.queue_item_added(&item, queue.len() - 1);
            }
            Request::InsertAfter(uri, after_id) => {
                if let Some(pos) = queue.iter().position(|i| i.id == after_id) {
                    let item = new_item(&mut next_id, uri);
                    queue.insert(pos + 1, item.clone());
                    hub.queue_item_added(&item, pos + 1);
                }
            }
            Request::Select(id) => {
                hub.played_item_changed(queue.iter().find(|i| i.id == id));
            }
            Request::Remove(id) => {
                if let Some(pos) = queue.iter().position(|i| i.id == id) {
                    let item = queue.remove(pos);
                    hub.queue_item_removed(&item, pos);
                }
            }
            Request::Clear => {
                queue.clear();
                hub.queue_cleared();
            }
        }
    }
}

fn new_item(next_id: &mut u32, uri: String) -> MediaItem {
    let title = uri.rsplit('/').next().unwrap_or_default().to_string();
    let item = MediaItem::new(*next_id, uri)
        .with_title(title)
        .with_duration(60.0);
    *next_id += 1;
    item
}

/// Creates an active hub on an ephemeral port, without mDNS.
pub async fn start_hub(queue_controllable: bool) -> (Arc<ControlHub>, Arc<TestPlayer>, u16) {
    let (hub, player) = create_hub(queue_controllable);
    hub.set_active(true).await.expect("hub should start");
    let port = hub.port().expect("active hub has a port");
    (hub, player, port)
}

pub fn create_hub(queue_controllable: bool) -> (Arc<ControlHub>, Arc<TestPlayer>) {
    create_hub_with(HubConfig {
        queue_controllable,
        ..test_config()
    })
}

pub fn test_config() -> HubConfig {
    HubConfig {
        announce: false,
        app_name: "hub-tests".to_string(),
        ..Default::default()
    }
}

fn test_player() -> (Arc<TestPlayer>, mpsc::UnboundedReceiver<Request>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let player = Arc::new(TestPlayer {
        tx,
        calls: Mutex::new(Vec::new()),
        errors: Mutex::new(Vec::new()),
    });
    (player, rx)
}

pub fn create_hub_with(config: HubConfig) -> (Arc<ControlHub>, Arc<TestPlayer>) {
    let (player, rx) = test_player();
    let hub = ControlHub::new(config, player.clone()).expect("valid config");
    tokio::spawn(simulate(rx, Arc::downgrade(&hub)));
    (hub, player)
}

/// Like [`create_hub_with`], through `ControlHub::start`.
pub async fn start_hub_with(config: HubConfig) -> (Arc<ControlHub>, Arc<TestPlayer>) {
    let (player, rx) = test_player();
    let hub = ControlHub::start(config, player.clone())
        .await
        .expect("hub should start");
    tokio::spawn(simulate(rx, Arc::downgrade(&hub)));
    (hub, player)
}

/// Polls until `condition` holds, panicking after the timeout.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn http_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

pub async fn connect(port: u16) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/websocket", port);
    let (ws, _) = tokio::time::timeout(TIMEOUT, tokio_tungstenite::connect_async(url))
        .await
        .expect("connect timed out")
        .expect("websocket handshake");
    ws
}

/// Next text frame, parsed as JSON.
pub async fn next_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("no event in time")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("event is JSON");
        }
    }
}

/// Reads events until one named `name` arrives, returning it with everything
/// seen before it.
pub async fn next_event_named(
    ws: &mut WsClient,
    name: &str,
) -> (serde_json::Value, Vec<serde_json::Value>) {
    let mut skipped = Vec::new();
    loop {
        let event = next_event(ws).await;
        if event["event"] == name {
            return (event, skipped);
        }
        skipped.push(event);
    }
}

pub async fn send(ws: &mut WsClient, text: &str) {
    ws.send(Message::text(text.to_string())).await.expect("send command");
}
