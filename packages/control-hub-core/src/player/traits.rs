use super::types::{ItemUpdatedFlags, MediaItem, PlayerState, ProgressionMode};
use crate::error::HubError;

/// Notifications delivered by the player to the hub.
///
/// Called from whatever thread the player runs its signal emission on.
/// Implementations must not call back into the player synchronously.
pub trait PlayerObserver: Send + Sync {
    fn state_changed(&self, state: PlayerState);

    /// Position in seconds.
    fn position_changed(&self, position: f64);

    fn speed_changed(&self, speed: f64);

    fn volume_changed(&self, volume: f64);

    fn mute_changed(&self, mute: bool);

    /// The current item changed, `None` when nothing is selected.
    fn played_item_changed(&self, item: Option<&MediaItem>);

    fn item_updated(&self, item: &MediaItem, flags: ItemUpdatedFlags);

    fn queue_item_added(&self, item: &MediaItem, index: usize);

    fn queue_item_removed(&self, item: &MediaItem, index: usize);

    fn queue_item_repositioned(&self, before: usize, after: usize);

    fn queue_cleared(&self);

    fn queue_progression_changed(&self, mode: ProgressionMode);
}

/// Commands the hub issues to the player.
///
/// All calls are fire-and-forget. The player may report the outcome through
/// [`PlayerObserver`], synchronously or later; the hub never holds its own
/// locks while calling into the controller.
pub trait PlayerController: Send + Sync {
    fn play(&self);

    fn pause(&self);

    fn stop(&self);

    /// Seek to a position in seconds.
    fn seek(&self, position: f64);

    fn set_speed(&self, speed: f64);

    fn set_volume(&self, volume: f64);

    fn set_mute(&self, mute: bool);

    fn set_queue_progression(&self, mode: ProgressionMode);

    /// Create an item from `uri` and append it to the queue.
    fn queue_append(&self, uri: &str);

    /// Create an item from `uri` and insert it right after item `after_id`.
    fn queue_insert_after(&self, uri: &str, after_id: u32);

    fn queue_select(&self, id: u32);

    fn queue_remove(&self, id: u32);

    fn queue_clear(&self);

    /// Generic error channel of the player (listener or announcer failures).
    fn report_error(&self, error: &HubError);

    /// Version of the player library, published in the mDNS TXT record.
    fn player_version(&self) -> String {
        "unknown".to_string()
    }
}
