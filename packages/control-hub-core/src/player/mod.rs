//! Capability interfaces between the control hub and its hosting player.
//!
//! The hub never talks to a playback engine directly. It observes the player
//! through [`PlayerObserver`] notifications and commands it through a
//! host-provided [`PlayerController`].

mod tags;
mod traits;
mod types;

pub use tags::{TagError, TagList, TagValue};
pub use traits::{PlayerController, PlayerObserver};
pub use types::{ItemUpdatedFlags, Marker, MarkerType, MediaItem, PlayerState, ProgressionMode};
