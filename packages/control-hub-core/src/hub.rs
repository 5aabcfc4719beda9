//! The control hub: mirrors player state and serves it to remote clients.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::actions::parse_frame;
use crate::api::ws_connection::{ConnectionGuard, OutboundMessage, WsConnectionManager};
use crate::dispatcher::plan;
use crate::error::{ErrorCode, HubError, HubResult};
use crate::events::{encode_event, encode_item_info, encode_snapshot, HubEvent, ItemInfo};
use crate::lifecycle::ServerLifecycle;
use crate::mdns_advertise::{Announcer, AnnouncerIdentity};
use crate::player::{
    ItemUpdatedFlags, MediaItem, PlayerController, PlayerObserver, PlayerState, ProgressionMode,
};
use crate::protocol_constants::HUB_NAME_PREFIX;
use crate::state::{HubConfig, MirrorState};

/// Process-wide counter for hub object names (`controlhub0`, `controlhub1`, ...).
static HUB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Remote-control synchronization server for one player.
///
/// Register the hub as the player's [`PlayerObserver`] and toggle it with
/// [`set_active`](Self::set_active). The server only holds a weak reference:
/// dropping the last handle stops the listener, closes every connection and
/// withdraws the announcement.
pub struct ControlHub {
    config: HubConfig,
    /// Object name used in the mDNS instance name and TXT `id`.
    name: String,
    mirror: Mutex<MirrorState>,
    connections: Arc<WsConnectionManager>,
    controller: Arc<dyn PlayerController>,
    lifecycle: ServerLifecycle,
    /// Created on first activation; lives as long as the hub.
    announcer: OnceLock<Announcer>,
}

impl ControlHub {
    /// Creates an inactive hub.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] if the configuration is invalid.
    pub fn new(config: HubConfig, controller: Arc<dyn PlayerController>) -> HubResult<Arc<Self>> {
        config.validate().map_err(HubError::Config)?;

        let name = format!(
            "{}{}",
            HUB_NAME_PREFIX,
            HUB_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        log::debug!("[Hub] Created {}", name);

        Ok(Arc::new(Self {
            connections: Arc::new(WsConnectionManager::new(config.connection_queue_capacity)),
            config,
            name,
            mirror: Mutex::new(MirrorState::new()),
            controller,
            lifecycle: ServerLifecycle::new(),
            announcer: OnceLock::new(),
        }))
    }

    /// Creates a hub and activates it right away when `config.active` is set.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new) and [`set_active`](Self::set_active).
    pub async fn start(
        config: HubConfig,
        controller: Arc<dyn PlayerController>,
    ) -> HubResult<Arc<Self>> {
        let hub = Self::new(config, controller)?;
        if hub.config.active {
            hub.set_active(true).await?;
        }
        Ok(hub)
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn controller(&self) -> &Arc<dyn PlayerController> {
        &self.controller
    }

    pub(crate) fn connections(&self) -> &Arc<WsConnectionManager> {
        &self.connections
    }

    /// Announcer for this hub, spawned on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn announcer(&self) -> &Announcer {
        self.announcer.get_or_init(|| {
            let identity = AnnouncerIdentity::new(
                &self.config.app_name,
                &self.name,
                self.controller.player_version(),
                &self.config.service_type,
            );
            Announcer::spawn(identity, Arc::clone(&self.controller))
        })
    }

    pub(crate) fn existing_announcer(&self) -> Option<&Announcer> {
        self.announcer.get()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts or stops the server. Repeated calls with the same value are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Server`] when the listener cannot be bound. The
    /// error is also reported to the player and the hub stays inactive.
    pub async fn set_active(self: &Arc<Self>, active: bool) -> HubResult<()> {
        if active {
            self.lifecycle.activate(self).await.map(|_| ())
        } else {
            self.lifecycle.deactivate(self).await;
            Ok(())
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Bound port while active.
    pub fn port(&self) -> Option<u16> {
        self.lifecycle.port()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Client side
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a new client, queuing the current snapshot as its first message.
    ///
    /// The snapshot is built and the connection registered under the mirror
    /// lock, so the client sees every later delta exactly once.
    ///
    /// Returns [`HubError::Unavailable`] when the hub is not serving. The
    /// check runs after registration: a deactivation that raced with it has
    /// either cancelled this connection or is visible here.
    pub(crate) fn connect(&self) -> HubResult<(ConnectionGuard, mpsc::Receiver<OutboundMessage>)> {
        let registered = {
            let mirror = self.mirror.lock();
            let snapshot =
                encode_snapshot(&mirror.snapshot(self.config.queue_controllable), true)?;
            self.connections.register(Arc::from(snapshot))
        };
        if !self.is_active() {
            return Err(HubError::Unavailable);
        }
        Ok(registered)
    }

    /// Handles one inbound text frame.
    pub fn handle_text(&self, text: &str) {
        for parsed in parse_frame(text) {
            let action = match parsed {
                Ok(action) => action,
                Err(e) => {
                    log::warn!("[Hub] Dropping command {:?}: {} ({})", text, e, e.code());
                    continue;
                }
            };

            let call = {
                let mirror = self.mirror.lock();
                plan(action, &mirror, self.config.queue_controllable)
            };
            // Mirror lock released: the player may notify us synchronously.
            if let Some(call) = call {
                log::debug!("[Hub] Executing {:?}", call);
                call.execute(self.controller.as_ref());
            }
        }
    }

    /// Current state as JSON, optionally tagged as a `snapshot` event.
    pub fn snapshot_json(&self, as_event: bool) -> HubResult<String> {
        let snapshot = self.mirror.lock().snapshot(self.config.queue_controllable);
        encode_snapshot(&snapshot, as_event)
    }

    pub fn item_info_json(&self, id: u32, with_timeline: bool) -> HubResult<String> {
        let info = {
            let mirror = self.mirror.lock();
            let item = mirror.find_item(id).ok_or(HubError::ItemNotFound(id))?;
            ItemInfo::from_item(item, with_timeline)
        };
        encode_item_info(&info)
    }

    /// Serialized tag list of an item.
    pub fn item_tags(&self, id: u32) -> HubResult<String> {
        let mirror = self.mirror.lock();
        let item = mirror.find_item(id).ok_or(HubError::ItemNotFound(id))?;
        Ok(item.tags.serialize()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player side
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies a mirror change and broadcasts its event under the same lock.
    fn apply(&self, change: impl FnOnce(&mut MirrorState) -> Option<HubEvent>) {
        let mut mirror = self.mirror.lock();
        let Some(event) = change(&mut mirror) else {
            return;
        };
        if !self.lifecycle.is_running() || self.connections.connection_count() == 0 {
            return;
        }
        match encode_event(&event) {
            Ok(text) => self.connections.broadcast(&OutboundMessage::from(text)),
            Err(e) => log::warn!("[Hub] Failed to encode {}: {}", event.name(), e),
        }
    }
}

impl Drop for ControlHub {
    fn drop(&mut self) {
        if self.lifecycle.abandon() {
            log::info!("[Hub] {} dropped while active, shutting down", self.name);
            self.connections.close_all();
        }
        // The announcer withdraws the service when its handle drops.
    }
}

impl PlayerObserver for ControlHub {
    fn state_changed(&self, state: PlayerState) {
        log::debug!("[Hub] Playback state changed to {:?}", state);
        self.apply(|m| m.set_state(state));
    }

    fn position_changed(&self, position: f64) {
        self.apply(|m| m.set_position(position));
    }

    fn speed_changed(&self, speed: f64) {
        log::trace!("[Hub] Speed changed to {:.2}", speed);
        self.apply(|m| m.set_speed(speed));
    }

    fn volume_changed(&self, volume: f64) {
        log::trace!("[Hub] Volume changed to {:.2}", volume);
        self.apply(|m| m.set_volume(volume));
    }

    fn mute_changed(&self, mute: bool) {
        log::debug!("[Hub] Mute {}", if mute { "enabled" } else { "disabled" });
        self.apply(|m| m.set_mute(mute));
    }

    fn played_item_changed(&self, item: Option<&MediaItem>) {
        log::debug!("[Hub] Played item changed to {:?}", item.map(|i| i.id));
        self.apply(|m| m.set_played_item(item));
    }

    fn item_updated(&self, item: &MediaItem, flags: ItemUpdatedFlags) {
        self.apply(|m| m.update_item(item, flags));
    }

    fn queue_item_added(&self, item: &MediaItem, index: usize) {
        log::debug!("[Hub] Queue item {} added at {}", item.id, index);
        self.apply(|m| m.add_item(item, index));
    }

    fn queue_item_removed(&self, item: &MediaItem, index: usize) {
        log::debug!("[Hub] Queue item {} removed at {}", item.id, index);
        self.apply(|m| m.remove_item(item, index));
    }

    fn queue_item_repositioned(&self, before: usize, after: usize) {
        log::debug!("[Hub] Queue item repositioned {} -> {}", before, after);
        self.apply(|m| m.reposition_item(before, after));
    }

    fn queue_cleared(&self) {
        log::debug!("[Hub] Queue cleared");
        self.apply(|m| m.clear_queue());
    }

    fn queue_progression_changed(&self, mode: ProgressionMode) {
        log::debug!("[Hub] Queue progression changed to {}", mode);
        self.apply(|m| m.set_progression(mode));
    }
}
