//! Typed views over daemon responses.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Torrent fields requested from `web.update_ui`, in request order.
pub const STATUS_FIELDS: [&str; 23] = [
    "distributed_copies",
    "download_payload_rate",
    "eta",
    "is_auto_managed",
    "max_download_speed",
    "max_upload_speed",
    "name",
    "num_peers",
    "num_seeds",
    "progress",
    "queue",
    "ratio",
    "save_path",
    "seeds_peers_ratio",
    "state",
    "time_added",
    "total_done",
    "total_peers",
    "total_seeds",
    "total_uploaded",
    "total_wanted",
    "tracker_host",
    "upload_payload_rate",
];

/// Daemon host selector for `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRef {
    /// Position in the list returned by `web.get_hosts`.
    Index(usize),
    /// Host identifier as listed by `web.get_hosts`.
    Id(String),
}

impl Default for HostRef {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for HostRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for HostRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for HostRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl FromStr for HostRef {
    type Err = Infallible;

    /// All-digit input selects by index; anything else is a host id.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        Ok(trimmed
            .parse::<usize>()
            .map_or_else(|_| Self::Id(trimmed.to_string()), Self::Index))
    }
}

/// Snapshot returned by `web.update_ui`.
///
/// Every field tolerates `null` as well as absence; keys without a typed
/// counterpart are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Whether the web UI is connected to a daemon.
    #[serde(default, deserialize_with = "null_as_default")]
    pub connected: bool,
    /// Sidebar filter counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<TorrentFilters>,
    /// Session-wide statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
    /// Torrents keyed by info hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrents: Option<HashMap<String, TorrentStatus>>,
    /// Untyped top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filter buckets as `(label, count)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentFilters {
    /// Counts per torrent state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: Vec<(String, u64)>,
    /// Counts per tracker host.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracker_host: Vec<(String, u64)>,
    /// Further buckets such as `label` or `owner`, as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Session statistics reported alongside the torrent table.
///
/// A disconnected web UI reports most of these as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    /// Known DHT nodes.
    pub dht_nodes: Option<i64>,
    /// Download rate including protocol overhead, bytes/s.
    pub download_protocol_rate: Option<f64>,
    /// Payload download rate, bytes/s.
    pub download_rate: Option<f64>,
    /// Free space in the default download directory, bytes.
    pub free_space: Option<i64>,
    /// Whether incoming connections have been observed.
    pub has_incoming_connections: Option<bool>,
    /// Global download cap, KiB/s.
    pub max_download: Option<f64>,
    /// Global connection cap.
    pub max_num_connections: Option<i64>,
    /// Global upload cap, KiB/s.
    pub max_upload: Option<f64>,
    /// Open peer connections.
    pub num_connections: Option<i64>,
    /// Upload rate including protocol overhead, bytes/s.
    pub upload_protocol_rate: Option<f64>,
    /// Payload upload rate, bytes/s.
    pub upload_rate: Option<f64>,
    /// Untyped statistics.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-torrent projection of [`STATUS_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentStatus {
    /// Distributed copies in the swarm.
    pub distributed_copies: Option<f64>,
    /// Payload download rate, bytes/s.
    pub download_payload_rate: Option<f64>,
    /// Estimated seconds to completion.
    pub eta: Option<f64>,
    /// Whether the queue manages this torrent.
    pub is_auto_managed: Option<bool>,
    /// Per-torrent download cap.
    pub max_download_speed: Option<f64>,
    /// Per-torrent upload cap.
    pub max_upload_speed: Option<f64>,
    /// Display name.
    pub name: Option<String>,
    /// Connected peers.
    pub num_peers: Option<i64>,
    /// Connected seeds.
    pub num_seeds: Option<i64>,
    /// Completion percentage, 0 to 100.
    pub progress: Option<f64>,
    /// Queue position, `-1` when not queued.
    pub queue: Option<i64>,
    /// Share ratio.
    pub ratio: Option<f64>,
    /// Download directory.
    pub save_path: Option<String>,
    /// Seeds to peers ratio.
    pub seeds_peers_ratio: Option<f64>,
    /// Daemon state label, e.g. `Downloading`.
    pub state: Option<String>,
    /// Unix timestamp the torrent was added.
    pub time_added: Option<f64>,
    /// Bytes downloaded.
    pub total_done: Option<i64>,
    /// Peers in the swarm.
    pub total_peers: Option<i64>,
    /// Seeds in the swarm.
    pub total_seeds: Option<i64>,
    /// Bytes uploaded.
    pub total_uploaded: Option<i64>,
    /// Bytes selected for download.
    pub total_wanted: Option<i64>,
    /// Tracker host name.
    pub tracker_host: Option<String>,
    /// Payload upload rate, bytes/s.
    pub upload_payload_rate: Option<f64>,
    /// Fields beyond [`STATUS_FIELDS`], as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
