//! Error types for Deluge web client operations.
//!
//! # Design
//! - Constant messages; operation context lives in structured fields.
//! - Daemon RPC errors are carried verbatim so callers can branch on the daemon's own codes.
//! - Transport failures keep their source and are never retried here.

use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Result alias for client operations.
pub type DelugeResult<T> = Result<T, DelugeError>;

/// Primary error type for Deluge web client operations.
#[derive(Debug, Error)]
pub enum DelugeError {
    /// Client configuration was invalid.
    #[error("invalid client configuration")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// The transport failed to deliver the request.
    #[error("transport request failed")]
    Transport {
        /// Endpoint the request targeted.
        endpoint: &'static str,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// The daemon answered with a non-2xx status.
    #[error("daemon responded with an unexpected HTTP status")]
    UnexpectedStatus {
        /// Endpoint the request targeted.
        endpoint: &'static str,
        /// HTTP status code received.
        status: u16,
    },
    /// Login was rejected by the daemon.
    #[error("authentication failed: incorrect or missing credential")]
    Authentication,
    /// The response envelope carried a non-null `error` field.
    #[error("daemon returned an RPC error")]
    Rpc {
        /// Remote method that failed.
        method: String,
        /// Error value exactly as sent by the daemon.
        error: Value,
    },
    /// The upload endpoint did not report success.
    #[error("torrent upload failed")]
    UploadFailed {
        /// File name sent with the upload.
        file_name: String,
    },
    /// `connect` was given a host index the daemon does not list.
    #[error("host index out of range")]
    HostIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of configured hosts.
        available: usize,
    },
    /// The daemon response did not have the expected shape.
    #[error("malformed daemon response")]
    MalformedResponse {
        /// Endpoint or method that produced the response.
        endpoint: &'static str,
        /// Machine-readable description of the mismatch.
        reason: &'static str,
    },
    /// Reading torrent content from a pending source failed.
    #[error("failed to read torrent source")]
    SourceRead {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An RPC result could not be decoded into the requested type.
    #[error("failed to decode RPC result")]
    Decode {
        /// Remote method whose result failed to decode.
        method: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl DelugeError {
    /// The daemon's own error value when this is an RPC error.
    #[must_use]
    pub const fn rpc_error(&self) -> Option<&Value> {
        match self {
            Self::Rpc { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Whether the failure was a rejected login.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}
