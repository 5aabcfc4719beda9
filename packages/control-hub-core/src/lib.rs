//! Control Hub Core - remote-control synchronization server for a media player.
//!
//! The hub mirrors a player's observable state (playback state, position,
//! speed, volume, mute, queue) and exposes it to remote clients on the local
//! network:
//!
//! - WebSocket clients get a snapshot on connect followed by ordered deltas,
//!   and send text commands back
//! - HTTP clients query the snapshot, item details and item tags
//! - The service is announced over mDNS/DNS-SD while active
//!
//! # Architecture
//!
//! - [`player`]: Capability traits between the hub and its hosting player
//! - [`state`]: Hub configuration and the mirrored state
//! - [`actions`]: Text command grammar
//! - [`dispatcher`]: Action to player-call resolution
//! - [`events`]: Event model and JSON encoding
//! - [`api`]: HTTP routes, WebSocket handler and connection fan-out
//! - [`lifecycle`]: Bind/serve/announce/teardown sequencing
//! - [`error`]: Centralized error types
//!
//! # Usage
//!
//! ```ignore
//! let hub = ControlHub::new(HubConfig::default(), controller)?;
//! player.add_observer(hub.clone());
//! hub.set_active(true).await?;
//! ```

#![warn(clippy::all)]

pub mod actions;
pub mod api;
pub mod dispatcher;
pub mod error;
pub mod events;
mod hub;
pub mod lifecycle;
mod mdns_advertise;
pub mod player;
pub mod protocol_constants;
pub mod state;

// Re-export commonly used types at the crate root
pub use actions::{parse_action, Action, ActionParseError};
pub use error::{ErrorCode, HubError, HubResult};
pub use events::{HubEvent, ItemInfo, Snapshot};
pub use hub::ControlHub;
pub use player::{
    ItemUpdatedFlags, Marker, MarkerType, MediaItem, PlayerController, PlayerObserver,
    PlayerState, ProgressionMode, TagError, TagList, TagValue,
};
pub use state::{HubConfig, MirrorState};
