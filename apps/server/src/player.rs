//! Loopback player: a playback simulation that stands in for a media engine.
//!
//! Control calls are queued to an engine task, which updates its own state and
//! reports every change back through [`PlayerObserver`], the same way a real
//! player delivers notifications from its own thread.

use std::sync::Arc;
use std::time::Duration;

use control_hub_core::{
    HubError, ItemUpdatedFlags, MediaItem, PlayerController, PlayerObserver, PlayerState,
    ProgressionMode, TagList,
};
use tokio::sync::mpsc;

#[derive(Debug)]
enum Request {
    Play,
    Pause,
    Stop,
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

/// Controller half, handed to the hub.
pub struct LoopbackPlayer {
    tx: mpsc::UnboundedSender<Request>,
}

impl LoopbackPlayer {
    fn send(&self, request: Request) {
        if self.tx.send(request).is_err() {
            log::warn!("[Player] Engine stopped, request dropped");
        }
    }
}

impl PlayerController for LoopbackPlayer {
    fn play(&self) {
        self.send(Request::Play);
    }
    fn pause(&self) {
        self.send(Request::Pause);
    }
    fn stop(&self) {
        self.send(Request::Stop);
    }
    fn seek(&self, position: f64) {
        self.send(Request::Seek(position));
    }
    fn set_speed(&self, speed: f64) {
        self.send(Request::Speed(speed));
    }
    fn set_volume(&self, volume: f64) {
        self.send(Request::Volume(volume));
    }
    fn set_mute(&self, mute: bool) {
        self.send(Request::Mute(mute));
    }
    fn set_queue_progression(&self, mode: ProgressionMode) {
        self.send(Request::Progression(mode));
    }
    fn queue_append(&self, uri: &str) {
        self.send(Request::Append(uri.to_string()));
    }
    fn queue_insert_after(&self, uri: &str, after_id: u32) {
        self.send(Request::InsertAfter(uri.to_string(), after_id));
    }
    fn queue_select(&self, id: u32) {
        self.send(Request::Select(id));
    }
    fn queue_remove(&self, id: u32) {
        self.send(Request::Remove(id));
    }
    fn queue_clear(&self) {
        self.send(Request::Clear);
    }

    fn report_error(&self, error: &HubError) {
        log::error!("[Player] Control hub error ({}): {}", error.code(), error);
    }

    fn player_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Engine half, driven by [`LoopbackEngine::run`].
pub struct LoopbackEngine {
    rx: mpsc::UnboundedReceiver<Request>,
    item_duration: f64,
    queue: Vec<MediaItem>,
    next_id: u32,
    played: Option<u32>,
    state: PlayerState,
    position: f64,
    speed: f64,
    volume: f64,
    mute: bool,
    progression: ProgressionMode,
    /// xorshift state for shuffle.
    seed: u32,
}

/// Creates a connected controller/engine pair.
pub fn loopback(item_duration: f64) -> (Arc<LoopbackPlayer>, LoopbackEngine) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = LoopbackEngine {
        rx,
        item_duration: item_duration.max(1.0),
        queue: Vec::new(),
        next_id: 1,
        played: None,
        state: PlayerState::Stopped,
        position: 0.0,
        speed: 1.0,
        volume: 1.0,
        mute: false,
        progression: ProgressionMode::None,
        seed: 0x9e37_79b9,
    };
    (Arc::new(LoopbackPlayer { tx }), engine)
}

impl LoopbackEngine {
    /// Processes requests and advances playback until the controller is gone.
    pub async fn run(mut self, observer: Arc<dyn PlayerObserver>, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(request) => self.handle(request, observer.as_ref()),
                    None => break,
                },
                _ = interval.tick() => self.advance(tick.as_secs_f64(), observer.as_ref()),
            }
        }
        log::debug!("[Player] Engine stopped");
    }

    fn handle(&mut self, request: Request, observer: &dyn PlayerObserver) {
        log::debug!("[Player] {:?}", request);
        match request {
            Request::Play => {
                if self.played.is_none() {
                    let Some(first) = self.queue.first().map(|item| item.id) else {
                        log::info!("[Player] Nothing to play");
                        return;
                    };
                    self.select(first, observer);
                }
                self.set_state(PlayerState::Playing, observer);
            }
            Request::Pause => {
                if self.state == PlayerState::Playing {
                    self.set_state(PlayerState::Paused, observer);
                }
            }
            Request::Stop => {
                self.set_state(PlayerState::Stopped, observer);
                self.set_position(0.0, observer);
            }
            Request::Seek(position) => {
                if self.played.is_some() {
                    self.set_position(position.clamp(0.0, self.item_duration), observer);
                }
            }
            Request::Speed(speed) => {
                self.speed = speed.clamp(0.01, 16.0);
                observer.speed_changed(self.speed);
            }
            Request::Volume(volume) => {
                self.volume = volume.clamp(0.0, 2.0);
                observer.volume_changed(self.volume);
            }
            Request::Mute(mute) => {
                if self.mute != mute {
                    self.mute = mute;
                    observer.mute_changed(mute);
                }
            }
            Request::Progression(mode) => {
                if self.progression != mode {
                    self.progression = mode;
                    observer.queue_progression_changed(mode);
                }
            }
            Request::Append(uri) => {
                let index = self.queue.len();
                self.insert(uri, index, observer);
            }
            Request::InsertAfter(uri, after_id) => {
                match self.queue.iter().position(|item| item.id == after_id) {
                    Some(pos) => self.insert(uri, pos + 1, observer),
                    None => log::warn!("[Player] Insert after unknown item {}", after_id),
                }
            }
            Request::Select(id) => {
                if self.queue.iter().any(|item| item.id == id) {
                    self.select(id, observer);
                }
            }
            Request::Remove(id) => {
                let Some(index) = self.queue.iter().position(|item| item.id == id) else {
                    return;
                };
                let item = self.queue.remove(index);
                observer.queue_item_removed(&item, index);
                if self.played == Some(id) {
                    self.played = None;
                    observer.played_item_changed(None);
                    self.set_state(PlayerState::Stopped, observer);
                    self.set_position(0.0, observer);
                }
            }
            Request::Clear => {
                self.queue.clear();
                observer.queue_cleared();
                if self.played.take().is_some() {
                    observer.played_item_changed(None);
                }
                self.set_state(PlayerState::Stopped, observer);
                self.set_position(0.0, observer);
            }
        }
    }

    /// Adds an item, then "discovers" its metadata like a real player would.
    fn insert(&mut self, uri: String, index: usize, observer: &dyn PlayerObserver) {
        let id = self.next_id;
        self.next_id += 1;

        let mut item = MediaItem::new(id, uri);
        self.queue.insert(index, item.clone());
        observer.queue_item_added(&item, index);

        let title = title_from_uri(&item.uri);
        item = item
            .with_title(title.clone())
            .with_duration(self.item_duration)
            .with_tags(TagList::new().with("title", title));
        observer.item_updated(
            &item,
            ItemUpdatedFlags::TITLE | ItemUpdatedFlags::DURATION | ItemUpdatedFlags::TAGS,
        );
        self.queue[index] = item;
    }

    fn select(&mut self, id: u32, observer: &dyn PlayerObserver) {
        self.played = Some(id);
        observer.played_item_changed(self.queue.iter().find(|item| item.id == id));
        self.set_position(0.0, observer);
    }

    fn set_state(&mut self, state: PlayerState, observer: &dyn PlayerObserver) {
        if self.state != state {
            self.state = state;
            observer.state_changed(state);
        }
    }

    fn set_position(&mut self, position: f64, observer: &dyn PlayerObserver) {
        self.position = position;
        observer.position_changed(position);
    }

    fn advance(&mut self, elapsed: f64, observer: &dyn PlayerObserver) {
        if self.state != PlayerState::Playing {
            return;
        }
        let position = self.position + elapsed * self.speed;
        if position < self.item_duration {
            self.set_position(position, observer);
            return;
        }

        match self.next_item() {
            Some(id) => self.select(id, observer),
            None => {
                self.set_state(PlayerState::Stopped, observer);
                self.set_position(0.0, observer);
            }
        }
    }

    /// Item to continue with when the current one ends.
    fn next_item(&mut self) -> Option<u32> {
        let current = self
            .played
            .and_then(|id| self.queue.iter().position(|item| item.id == id))?;
        let len = self.queue.len();
        let index = match self.progression {
            ProgressionMode::None => return None,
            ProgressionMode::RepeatItem => current,
            ProgressionMode::Consecutive if current + 1 >= len => return None,
            ProgressionMode::Consecutive => current + 1,
            ProgressionMode::Carousel => (current + 1) % len,
            ProgressionMode::Shuffle => {
                self.seed ^= self.seed << 13;
                self.seed ^= self.seed >> 17;
                self.seed ^= self.seed << 5;
                self.seed as usize % len
            }
        };
        self.queue.get(index).map(|item| item.id)
    }
}

fn title_from_uri(uri: &str) -> String {
    let name = uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    if stem.is_empty() {
        uri.to_string()
    } else {
        stem.to_string()
    }
}
