//! Player-side value types shared by notifications, commands and the wire format.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::tags::TagList;

/// Implements `Serialize` as the variant's numeric wire value.
macro_rules! serialize_as_u32 {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u32(*self as u32)
            }
        }
    };
}

/// Playback state reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PlayerState {
    #[default]
    Stopped = 0,
    Buffering = 1,
    Paused = 2,
    Playing = 3,
}

serialize_as_u32!(PlayerState);

/// Queue auto-advance behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum ProgressionMode {
    /// Stop after the current item.
    #[default]
    None = 0,
    /// Advance to the next item, stop at the end of the queue.
    Consecutive = 1,
    /// Replay the current item.
    RepeatItem = 2,
    /// Advance and wrap around to the first item.
    Carousel = 3,
    /// Pick a random item.
    Shuffle = 4,
}

serialize_as_u32!(ProgressionMode);

impl ProgressionMode {
    /// Maps a numeric wire value back to a mode.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Consecutive),
            2 => Some(Self::RepeatItem),
            3 => Some(Self::Carousel),
            4 => Some(Self::Shuffle),
            _ => None,
        }
    }

    /// Returns the snake_case name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Consecutive => "consecutive",
            Self::RepeatItem => "repeat_item",
            Self::Carousel => "carousel",
            Self::Shuffle => "shuffle",
        }
    }
}

impl FromStr for ProgressionMode {
    type Err = ();

    /// Accepts either the numeric value or the snake_case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<u32>() {
            return Self::from_u32(value).ok_or(());
        }
        match s {
            "none" => Ok(Self::None),
            "consecutive" => Ok(Self::Consecutive),
            "repeat_item" => Ok(Self::RepeatItem),
            "carousel" => Ok(Self::Carousel),
            "shuffle" => Ok(Self::Shuffle),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProgressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a timeline marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MarkerType {
    #[default]
    Unknown = 0,
    Title = 1,
    Chapter = 2,
    Track = 3,
    Custom1 = 4,
    Custom2 = 5,
    Custom3 = 6,
}

serialize_as_u32!(MarkerType);

/// A point or range on an item's timeline (chapter, track, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub marker_type: MarkerType,
    pub title: String,
    /// Start in seconds.
    pub start: f64,
    /// End in seconds, negative when the marker has no end.
    pub end: f64,
}

impl Marker {
    pub fn new(marker_type: MarkerType, title: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            marker_type,
            title: title.into(),
            start,
            end,
        }
    }
}

/// Set of metadata fields that changed in an `item_updated` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ItemUpdatedFlags(u32);

impl ItemUpdatedFlags {
    pub const NONE: Self = Self(0);
    pub const TITLE: Self = Self(1 << 0);
    pub const DURATION: Self = Self(1 << 1);
    pub const TIMELINE: Self = Self(1 << 2);
    pub const TAGS: Self = Self(1 << 3);
    /// Consumed by the player internally, never forwarded to clients.
    pub const REDIRECT_URI: Self = Self(1 << 4);
    /// Consumed by the player internally, never forwarded to clients.
    pub const CACHE_LOCATION: Self = Self(1 << 5);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Drops the flags that only matter to the player itself.
    pub fn client_visible(self) -> Self {
        self & !(Self::REDIRECT_URI | Self::CACHE_LOCATION)
    }
}

impl BitOr for ItemUpdatedFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for ItemUpdatedFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ItemUpdatedFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Value copy of a player-owned queue item.
///
/// The player assigns `id`; it is unique within the player's lifetime.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaItem {
    pub id: u32,
    pub uri: String,
    pub title: String,
    /// Duration in seconds, 0 when unknown.
    pub duration: f64,
    pub timeline: Vec<Marker>,
    pub tags: TagList,
}

impl MediaItem {
    pub fn new(id: u32, uri: impl Into<String>) -> Self {
        Self {
            id,
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_timeline(mut self, timeline: Vec<Marker>) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_tags(mut self, tags: TagList) -> Self {
        self.tags = tags;
        self
    }
}
