//! Fixed protocol constants that should NOT be changed.
//!
//! These values are part of the wire contract shared with remote clients
//! (event names, paths, sentinels, numeric precision) and changing them would
//! break existing clients.

// ─────────────────────────────────────────────────────────────────────────────
// mDNS / DNS-SD
// ─────────────────────────────────────────────────────────────────────────────

/// Default service type advertised over mDNS (trailing dot required by mdns-sd).
pub const DEFAULT_SERVICE_TYPE: &str = "_clapper._tcp.local.";

/// Prefix of the per-hub object name used in the instance name and TXT `id`.
pub const HUB_NAME_PREFIX: &str = "controlhub";

/// TXT key: program name of the hosting application.
pub const TXT_APP: &str = "app";

/// TXT key: version of the player library.
pub const TXT_PLAYER_VERSION: &str = "cver";

/// TXT key: version of this control hub protocol implementation.
pub const TXT_HUB_VERSION: &str = "chver";

/// TXT key: unique id of this hub instance.
pub const TXT_ID: &str = "id";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP / WebSocket
// ─────────────────────────────────────────────────────────────────────────────

/// WebSocket upgrade path.
pub const WS_PATH: &str = "/websocket";

/// Value of the `Server` response header.
pub const SERVER_HEADER: &str = "ClapperControlHub";

/// Content type of the `/tags` response.
pub const TAGS_CONTENT_TYPE: &str = "application/octet-stream";

// ─────────────────────────────────────────────────────────────────────────────
// Event encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Wire value of `played_index` when no item is current.
pub const INVALID_QUEUE_INDEX: u32 = u32::MAX;

/// Decimal places for time values (position, duration, marker bounds).
pub const TIME_PRECISION: usize = 3;

/// Decimal places for speed and volume.
pub const LEVEL_PRECISION: usize = 2;

/// Default per-connection outbound queue capacity (events).
pub const DEFAULT_CONNECTION_QUEUE_CAPACITY: usize = 256;
