//! Event model pushed to WebSocket clients and served over HTTP.
//!
//! This module provides:
//! - [`HubEvent`], the delta/snapshot messages broadcast to clients
//! - [`Snapshot`] and [`ItemInfo`], the documents behind `GET /` and `GET /item`
//! - The encoder functions in [`encoder`] that render them with the fixed
//!   numeric precision clients rely on

pub mod encoder;

pub use encoder::{encode_event, encode_item_info, encode_snapshot};

use serde::Serialize;

use crate::player::{ItemUpdatedFlags, Marker, MarkerType, MediaItem, PlayerState, ProgressionMode};
use encoder::{fixed2, fixed3, queue_index};

/// Messages broadcast to every connected client.
///
/// Serialized with the `event` key first, e.g.
/// `{"event":"volume_changed","volume":0.50}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HubEvent {
    /// Full state, sent once to each new connection before any delta.
    Snapshot(Snapshot),

    StateChanged {
        state: PlayerState,
    },
    PositionChanged {
        #[serde(serialize_with = "fixed3")]
        position: f64,
    },
    SpeedChanged {
        #[serde(serialize_with = "fixed2")]
        speed: f64,
    },
    VolumeChanged {
        #[serde(serialize_with = "fixed2")]
        volume: f64,
    },
    MuteChanged {
        mute: bool,
    },
    PlayedIndexChanged {
        #[serde(serialize_with = "queue_index")]
        played_index: Option<usize>,
    },
    ProgressionChanged {
        progression: ProgressionMode,
    },

    /// Item metadata changed; clients refetch through `/item` or `/tags`.
    ItemUpdated {
        id: u32,
        flags: ItemUpdatedFlags,
    },
    ItemAdded {
        id: u32,
        index: usize,
    },
    ItemRemoved {
        id: u32,
        index: usize,
    },
    ItemRepositioned {
        before: usize,
        after: usize,
    },
    QueueCleared,
}

impl HubEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::StateChanged { .. } => "state_changed",
            Self::PositionChanged { .. } => "position_changed",
            Self::SpeedChanged { .. } => "speed_changed",
            Self::VolumeChanged { .. } => "volume_changed",
            Self::MuteChanged { .. } => "mute_changed",
            Self::PlayedIndexChanged { .. } => "played_index_changed",
            Self::ProgressionChanged { .. } => "progression_changed",
            Self::ItemUpdated { .. } => "item_updated",
            Self::ItemAdded { .. } => "item_added",
            Self::ItemRemoved { .. } => "item_removed",
            Self::ItemRepositioned { .. } => "item_repositioned",
            Self::QueueCleared => "queue_cleared",
        }
    }
}

/// Full mirrored state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: PlayerState,
    #[serde(serialize_with = "fixed3")]
    pub position: f64,
    #[serde(serialize_with = "fixed2")]
    pub speed: f64,
    #[serde(serialize_with = "fixed2")]
    pub volume: f64,
    pub mute: bool,
    pub queue: QueueSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    /// Whether remote clients may mutate the queue.
    pub controllable: bool,
    pub progression: ProgressionMode,
    #[serde(serialize_with = "queue_index")]
    pub played_index: Option<usize>,
    pub items: Vec<ItemSummary>,
}

/// Queue entry as listed in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: u32,
    pub title: String,
    #[serde(serialize_with = "fixed3")]
    pub duration: f64,
}

impl From<&MediaItem> for ItemSummary {
    fn from(item: &MediaItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            duration: item.duration,
        }
    }
}

/// Detailed item document served by `GET /item`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemInfo {
    pub id: u32,
    pub title: String,
    #[serde(serialize_with = "fixed3")]
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<MarkerInfo>>,
}

impl ItemInfo {
    pub fn from_item(item: &MediaItem, with_timeline: bool) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            duration: item.duration,
            timeline: with_timeline.then(|| item.timeline.iter().map(MarkerInfo::from).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerInfo {
    pub marker_type: MarkerType,
    pub title: String,
    #[serde(serialize_with = "fixed3")]
    pub start: f64,
    #[serde(serialize_with = "fixed3")]
    pub end: f64,
}

impl From<&Marker> for MarkerInfo {
    fn from(marker: &Marker) -> Self {
        Self {
            marker_type: marker.marker_type,
            title: marker.title.clone(),
            start: marker.start,
            end: marker.end,
        }
    }
}
