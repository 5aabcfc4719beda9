//! Hub configuration and the mirrored player state.
//!
//! [`MirrorState`] is the hub's local copy of everything a remote client can
//! see. Each setter applies one player notification and returns the event to
//! broadcast, if any. Callers hold the mirror lock across apply + broadcast so
//! the order clients observe matches the order notifications arrived in.

use serde::{Deserialize, Serialize};

use crate::events::{HubEvent, ItemSummary, QueueSnapshot, Snapshot};
use crate::player::{ItemUpdatedFlags, MediaItem, PlayerState, ProgressionMode};
use crate::protocol_constants::{
    DEFAULT_CONNECTION_QUEUE_CAPACITY, DEFAULT_SERVICE_TYPE, LEVEL_PRECISION,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for a control hub instance.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Run the server and announce it. Toggled at runtime through
    /// `ControlHub::set_active`.
    pub active: bool,

    /// Allow remote clients to add, insert, select, remove and clear items.
    pub queue_controllable: bool,

    /// Advertise the service over mDNS while active.
    pub announce: bool,

    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    /// Program name published in the TXT record and instance name.
    pub app_name: String,

    /// DNS-SD service type (fully qualified, trailing dot).
    pub service_type: String,

    /// Per-connection outbound queue capacity (events).
    pub connection_queue_capacity: usize,
}

impl HubConfig {
    /// Validates configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would cause runtime issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_queue_capacity == 0 {
            return Err(
                "connection_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        if self.app_name.trim().is_empty() {
            return Err("app_name must not be empty".to_string());
        }
        if !self.service_type.starts_with('_') || !self.service_type.ends_with(".local.") {
            return Err(format!(
                "service_type must look like '_name._tcp.local.', got {:?}",
                self.service_type
            ));
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            active: false,
            queue_controllable: false,
            announce: true,
            preferred_port: 0,
            app_name: default_app_name(),
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            connection_queue_capacity: DEFAULT_CONNECTION_QUEUE_CAPACITY,
        }
    }
}

/// File stem of the running executable.
fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Mirrored State
// ─────────────────────────────────────────────────────────────────────────────

/// Local copy of the player's observable state.
///
/// # Invariants
///
/// - `items` mirrors the player queue in order.
/// - `played_index` is `Some(i)` exactly when the played item is `items[i]`.
#[derive(Debug, Clone)]
pub struct MirrorState {
    state: PlayerState,
    position: f64,
    speed: f64,
    volume: f64,
    mute: bool,
    progression: ProgressionMode,
    items: Vec<MediaItem>,
    played_id: Option<u32>,
    played_index: Option<usize>,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            state: PlayerState::Stopped,
            position: 0.0,
            speed: 1.0,
            volume: 1.0,
            mute: false,
            progression: ProgressionMode::None,
            items: Vec::new(),
            played_id: None,
            played_index: None,
        }
    }
}

/// Values equal once rendered with `precision` decimals.
fn same_at_precision(a: f64, b: f64, precision: usize) -> bool {
    format!("{:.*}", precision, a) == format!("{:.*}", precision, b)
}

impl MirrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn progression(&self) -> ProgressionMode {
        self.progression
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn played_index(&self) -> Option<usize> {
        self.played_index
    }

    pub fn find_item(&self, id: u32) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scalar notifications
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_state(&mut self, state: PlayerState) -> Option<HubEvent> {
        if self.state == state {
            return None;
        }
        self.state = state;
        Some(HubEvent::StateChanged { state })
    }

    /// Stores the position; emits only when the whole second changes.
    pub fn set_position(&mut self, position: f64) -> Option<HubEvent> {
        let previous = self.position;
        self.position = position;
        if previous.trunc() == position.trunc() {
            return None;
        }
        log::trace!("[Hub] Position changed to {:.3}", position);
        Some(HubEvent::PositionChanged { position })
    }

    pub fn set_speed(&mut self, speed: f64) -> Option<HubEvent> {
        let previous = self.speed;
        self.speed = speed;
        if same_at_precision(previous, speed, LEVEL_PRECISION) {
            return None;
        }
        Some(HubEvent::SpeedChanged { speed })
    }

    pub fn set_volume(&mut self, volume: f64) -> Option<HubEvent> {
        let previous = self.volume;
        self.volume = volume;
        if same_at_precision(previous, volume, LEVEL_PRECISION) {
            return None;
        }
        Some(HubEvent::VolumeChanged { volume })
    }

    pub fn set_mute(&mut self, mute: bool) -> Option<HubEvent> {
        if self.mute == mute {
            return None;
        }
        self.mute = mute;
        Some(HubEvent::MuteChanged { mute })
    }

    pub fn set_progression(&mut self, progression: ProgressionMode) -> Option<HubEvent> {
        if self.progression == progression {
            return None;
        }
        self.progression = progression;
        Some(HubEvent::ProgressionChanged { progression })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Records the new current item and resolves its queue index.
    pub fn set_played_item(&mut self, item: Option<&MediaItem>) -> Option<HubEvent> {
        self.played_id = item.map(|item| item.id);
        self.refresh_played_index();
        Some(HubEvent::PlayedIndexChanged {
            played_index: self.played_index,
        })
    }

    /// Refreshes the mirrored copy and forwards client-relevant flags.
    pub fn update_item(&mut self, item: &MediaItem, flags: ItemUpdatedFlags) -> Option<HubEvent> {
        if let Some(stored) = self.items.iter_mut().find(|stored| stored.id == item.id) {
            *stored = item.clone();
        }
        let flags = flags.client_visible();
        if flags.is_empty() {
            return None;
        }
        Some(HubEvent::ItemUpdated { id: item.id, flags })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queue notifications
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_item(&mut self, item: &MediaItem, index: usize) -> Option<HubEvent> {
        let index = if index > self.items.len() {
            log::warn!(
                "[Hub] Item {} added at {} past queue end {}, appending",
                item.id,
                index,
                self.items.len()
            );
            self.items.len()
        } else {
            index
        };
        self.items.insert(index, item.clone());
        self.refresh_played_index();
        Some(HubEvent::ItemAdded { id: item.id, index })
    }

    pub fn remove_item(&mut self, item: &MediaItem, index: usize) -> Option<HubEvent> {
        let index = if self.items.get(index).is_some_and(|stored| stored.id == item.id) {
            index
        } else {
            match self.items.iter().position(|stored| stored.id == item.id) {
                Some(found) => {
                    log::warn!(
                        "[Hub] Item {} reported removed at {}, found at {}",
                        item.id,
                        index,
                        found
                    );
                    found
                }
                None => {
                    log::warn!("[Hub] Removal of unknown item {} ignored", item.id);
                    return None;
                }
            }
        };

        self.items.remove(index);
        if self.played_id == Some(item.id) {
            self.played_id = None;
        }
        self.refresh_played_index();
        Some(HubEvent::ItemRemoved { id: item.id, index })
    }

    pub fn reposition_item(&mut self, before: usize, after: usize) -> Option<HubEvent> {
        let len = self.items.len();
        if before >= len || after >= len {
            log::warn!(
                "[Hub] Reposition {} -> {} out of range (queue length {}), ignored",
                before,
                after,
                len
            );
            return None;
        }
        let item = self.items.remove(before);
        self.items.insert(after, item);
        self.refresh_played_index();
        Some(HubEvent::ItemRepositioned { before, after })
    }

    pub fn clear_queue(&mut self) -> Option<HubEvent> {
        self.items.clear();
        self.played_id = None;
        self.played_index = None;
        Some(HubEvent::QueueCleared)
    }

    fn refresh_played_index(&mut self) {
        self.played_index = self
            .played_id
            .and_then(|id| self.items.iter().position(|item| item.id == id));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshot
    // ─────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self, queue_controllable: bool) -> Snapshot {
        Snapshot {
            state: self.state,
            position: self.position,
            speed: self.speed,
            volume: self.volume,
            mute: self.mute,
            queue: QueueSnapshot {
                controllable: queue_controllable,
                progression: self.progression,
                played_index: self.played_index,
                items: self.items.iter().map(ItemSummary::from).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32) -> MediaItem {
        MediaItem::new(id, format!("file:///media/{}.mkv", id)).with_title(format!("Item {}", id))
    }

    fn ids(mirror: &MirrorState) -> Vec<u32> {
        mirror.items().iter().map(|item| item.id).collect()
    }

    /// `played_index` must always point at the played item.
    fn assert_played_consistent(mirror: &MirrorState, played: Option<u32>) {
        match played {
            Some(id) => {
                let index = mirror.played_index().expect("played index");
                assert_eq!(mirror.items()[index].id, id);
            }
            None => assert_eq!(mirror.played_index(), None),
        }
    }

    #[test]
    fn defaults_match_player_defaults() {
        let mirror = MirrorState::new();
        assert_eq!(mirror.state(), PlayerState::Stopped);
        assert_eq!(mirror.speed(), 1.0);
        assert_eq!(mirror.volume(), 1.0);
        assert!(!mirror.mute());
        assert_eq!(mirror.played_index(), None);
    }

    #[test]
    fn queue_follows_notification_sequence() {
        let mut mirror = MirrorState::new();
        mirror.add_item(&item(1), 0);
        mirror.add_item(&item(2), 1);
        mirror.add_item(&item(3), 1);
        assert_eq!(ids(&mirror), vec![1, 3, 2]);

        mirror.reposition_item(0, 2);
        assert_eq!(ids(&mirror), vec![3, 2, 1]);

        let event = mirror.remove_item(&item(2), 1);
        assert_eq!(event, Some(HubEvent::ItemRemoved { id: 2, index: 1 }));
        assert_eq!(ids(&mirror), vec![3, 1]);

        assert_eq!(mirror.clear_queue(), Some(HubEvent::QueueCleared));
        assert!(mirror.items().is_empty());
    }

    #[test]
    fn played_index_tracks_queue_mutations() {
        let mut mirror = MirrorState::new();
        for (index, id) in [10, 20, 30].into_iter().enumerate() {
            mirror.add_item(&item(id), index);
        }

        let event = mirror.set_played_item(Some(&item(20)));
        assert_eq!(
            event,
            Some(HubEvent::PlayedIndexChanged {
                played_index: Some(1)
            })
        );

        mirror.add_item(&item(5), 0);
        assert_played_consistent(&mirror, Some(20));

        mirror.reposition_item(2, 0);
        assert_played_consistent(&mirror, Some(20));

        mirror.remove_item(&item(5), 1);
        assert_played_consistent(&mirror, Some(20));

        mirror.remove_item(&item(20), 0);
        assert_played_consistent(&mirror, None);
        assert_eq!(ids(&mirror), vec![10, 30]);
    }

    #[test]
    fn played_item_outside_queue_uses_sentinel() {
        let mut mirror = MirrorState::new();
        mirror.add_item(&item(1), 0);
        let event = mirror.set_played_item(Some(&item(99)));
        assert_eq!(
            event,
            Some(HubEvent::PlayedIndexChanged { played_index: None })
        );
        let event = mirror.set_played_item(None);
        assert_eq!(
            event,
            Some(HubEvent::PlayedIndexChanged { played_index: None })
        );
    }

    #[test]
    fn position_coalesces_to_whole_seconds() {
        let mut mirror = MirrorState::new();
        assert!(mirror.set_position(1.2).is_some());
        assert!(mirror.set_position(1.8).is_none());
        assert_eq!(
            mirror.set_position(2.1),
            Some(HubEvent::PositionChanged { position: 2.1 })
        );
        assert_eq!(mirror.position(), 2.1);
    }

    #[test]
    fn levels_emit_only_on_visible_change() {
        let mut mirror = MirrorState::new();
        assert!(mirror.set_volume(1.001).is_none());
        assert_eq!(mirror.volume(), 1.001);
        assert!(mirror.set_volume(0.5).is_some());
        assert!(mirror.set_speed(1.0).is_none());
        assert!(mirror.set_speed(2.0).is_some());
    }

    #[test]
    fn scalar_setters_suppress_repeats() {
        let mut mirror = MirrorState::new();
        assert!(mirror.set_state(PlayerState::Stopped).is_none());
        assert!(mirror.set_state(PlayerState::Playing).is_some());
        assert!(mirror.set_mute(true).is_some());
        assert!(mirror.set_mute(true).is_none());
        assert!(mirror.set_progression(ProgressionMode::Shuffle).is_some());
        assert!(mirror.set_progression(ProgressionMode::Shuffle).is_none());
    }

    #[test]
    fn internal_update_flags_are_filtered() {
        let mut mirror = MirrorState::new();
        mirror.add_item(&item(1), 0);

        let updated = item(1).with_title("Renamed");
        assert!(mirror
            .update_item(&updated, ItemUpdatedFlags::REDIRECT_URI)
            .is_none());
        // The copy is refreshed even when nothing is forwarded.
        assert_eq!(mirror.find_item(1).map(|i| i.title.as_str()), Some("Renamed"));

        let event = mirror.update_item(
            &updated,
            ItemUpdatedFlags::TITLE | ItemUpdatedFlags::CACHE_LOCATION,
        );
        assert_eq!(
            event,
            Some(HubEvent::ItemUpdated {
                id: 1,
                flags: ItemUpdatedFlags::TITLE
            })
        );
    }

    #[test]
    fn bad_indices_are_tolerated() {
        let mut mirror = MirrorState::new();
        assert_eq!(
            mirror.add_item(&item(1), 5),
            Some(HubEvent::ItemAdded { id: 1, index: 0 })
        );
        mirror.add_item(&item(2), 1);

        // Stale index, matched by id instead.
        assert_eq!(
            mirror.remove_item(&item(1), 1),
            Some(HubEvent::ItemRemoved { id: 1, index: 0 })
        );
        assert!(mirror.remove_item(&item(42), 0).is_none());
        assert!(mirror.reposition_item(0, 3).is_none());
        assert_eq!(ids(&mirror), vec![2]);
    }

    #[test]
    fn snapshot_reflects_mirror() {
        let mut mirror = MirrorState::new();
        mirror.add_item(&item(7).with_duration(12.5), 0);
        mirror.set_played_item(Some(&item(7)));
        mirror.set_state(PlayerState::Paused);

        let snapshot = mirror.snapshot(true);
        assert_eq!(snapshot.state, PlayerState::Paused);
        assert!(snapshot.queue.controllable);
        assert_eq!(snapshot.queue.played_index, Some(0));
        assert_eq!(snapshot.queue.items[0].duration, 12.5);
        assert_eq!(snapshot.queue.items[0].title, "Item 7");
    }

    #[test]
    fn config_defaults_are_valid() {
        let config = HubConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.announce);
        assert!(!config.active);
        assert_eq!(config.service_type, "_clapper._tcp.local.");
    }

    #[test]
    fn config_rejects_zero_capacity() {
        let config = HubConfig {
            connection_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_partial_documents() {
        let config: HubConfig =
            serde_json::from_str(r#"{"queue_controllable":true,"preferred_port":8088}"#).unwrap();
        assert!(config.queue_controllable);
        assert_eq!(config.preferred_port, 8088);
        assert_eq!(config.connection_queue_capacity, 256);
    }
}
