#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Async client for the Deluge web UI JSON-RPC API.
//!
//! Layout:
//! - `client.rs`: session-aware dispatcher, login flow and host connection
//! - `torrents.rs`: torrent submission (upload, URL fetch, add) and status reads
//! - `source.rs`: torrent source tagging and classification
//! - `options.rs`: per-torrent add options and their defaults
//! - `protocol.rs`: wire envelopes, method names and truthiness rules
//! - `transport.rs`: HTTP boundary and the bundled `reqwest` adapter
//! - `config.rs`: endpoint, password and timeout configuration
//! - `models.rs`: typed views over daemon responses
//! - `error.rs`: error taxonomy shared by every operation

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod options;
pub mod protocol;
mod session;
pub mod source;
#[cfg(test)]
mod testing;
mod torrents;
pub mod transport;

pub use client::DelugeClient;
pub use config::{ConfigError, DelugeConfig};
pub use error::{DelugeError, DelugeResult};
pub use models::{HostRef, STATUS_FIELDS, TorrentRecord};
pub use options::{TorrentConfig, TorrentOptions};
pub use session::REQUEST_ID_CEILING;
pub use source::TorrentSource;
pub use transport::{ReqwestTransport, Transport};
