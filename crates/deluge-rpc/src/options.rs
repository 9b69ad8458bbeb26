//! Torrent add options and their defaults.
//!
//! # Design
//! - [`TorrentConfig`] is what callers supply: every field optional, unknown daemon keys kept.
//! - [`TorrentOptions`] is what the daemon receives: defaults overlaid field-by-field.
//! - The one-shot URL fetch cookie lives on the config and never reaches the options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Option keys with a typed field; extra keys using these names are dropped on merge.
const TYPED_KEYS: [&str; 10] = [
    "file_priorities",
    "add_paused",
    "compact_allocation",
    "max_connections",
    "max_download_speed",
    "max_upload_slots",
    "max_upload_speed",
    "prioritize_first_last_pieces",
    "download_location",
    "cookie",
];

/// Caller-supplied options for adding a torrent.
///
/// A bare string converts into a config that only sets `download_location`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentConfig {
    /// Per-file download priorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_priorities: Option<Vec<i64>>,
    /// Add the torrent in the paused state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_paused: Option<bool>,
    /// Use compact (sparse) allocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_allocation: Option<bool>,
    /// Connection cap, `-1` for unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
    /// Download rate cap in KiB/s, `-1` for unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_download_speed: Option<i64>,
    /// Upload slot cap, `-1` for unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_slots: Option<i64>,
    /// Upload rate cap in KiB/s, `-1` for unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_speed: Option<i64>,
    /// Download the first and last pieces of each file first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioritize_first_last_pieces: Option<bool>,
    /// Directory the daemon should download into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    /// Cookie sent with a URL fetch; never forwarded to the add call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    /// Additional daemon options passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TorrentConfig {
    /// Config that only sets the download location.
    #[must_use]
    pub fn download_location(path: impl Into<String>) -> Self {
        Self {
            download_location: Some(path.into()),
            ..Self::default()
        }
    }

    /// Remove and return the one-shot URL fetch cookie.
    pub fn take_cookie(&mut self) -> Option<String> {
        self.cookie.take()
    }

    /// Overlay this config onto the defaults. The cookie is discarded.
    #[must_use]
    pub fn merged(self) -> TorrentOptions {
        let defaults = TorrentOptions::default();
        let mut extra = self.extra;
        extra.retain(|key, _| !TYPED_KEYS.contains(&key.as_str()));

        TorrentOptions {
            file_priorities: self.file_priorities.unwrap_or(defaults.file_priorities),
            add_paused: self.add_paused.unwrap_or(defaults.add_paused),
            compact_allocation: self
                .compact_allocation
                .unwrap_or(defaults.compact_allocation),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            max_download_speed: self
                .max_download_speed
                .unwrap_or(defaults.max_download_speed),
            max_upload_slots: self.max_upload_slots.unwrap_or(defaults.max_upload_slots),
            max_upload_speed: self.max_upload_speed.unwrap_or(defaults.max_upload_speed),
            prioritize_first_last_pieces: self
                .prioritize_first_last_pieces
                .unwrap_or(defaults.prioritize_first_last_pieces),
            download_location: self.download_location,
            extra,
        }
    }
}

impl From<&str> for TorrentConfig {
    fn from(path: &str) -> Self {
        Self::download_location(path)
    }
}

impl From<String> for TorrentConfig {
    fn from(path: String) -> Self {
        Self::download_location(path)
    }
}

impl From<Option<Self>> for TorrentConfig {
    fn from(config: Option<Self>) -> Self {
        config.unwrap_or_default()
    }
}

/// Fully resolved options sent with `web.add_torrents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorrentOptions {
    /// Per-file download priorities.
    pub file_priorities: Vec<i64>,
    /// Add the torrent in the paused state.
    pub add_paused: bool,
    /// Use compact (sparse) allocation.
    pub compact_allocation: bool,
    /// Connection cap, `-1` for unlimited.
    pub max_connections: i64,
    /// Download rate cap, `-1` for unlimited.
    pub max_download_speed: i64,
    /// Upload slot cap, `-1` for unlimited.
    pub max_upload_slots: i64,
    /// Upload rate cap, `-1` for unlimited.
    pub max_upload_speed: i64,
    /// Download the first and last pieces of each file first.
    pub prioritize_first_last_pieces: bool,
    /// Directory the daemon should download into, when overridden.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    /// Additional daemon options passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TorrentOptions {
    fn default() -> Self {
        Self {
            file_priorities: Vec::new(),
            add_paused: false,
            compact_allocation: true,
            max_connections: -1,
            max_download_speed: -1,
            max_upload_slots: -1,
            max_upload_speed: -1,
            prioritize_first_last_pieces: false,
            download_location: None,
            extra: Map::new(),
        }
    }
}
