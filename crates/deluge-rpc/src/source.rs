//! Torrent sources and their classification.
//!
//! # Design
//! - Callers tag what they hold once, at the call boundary; no runtime sniffing afterwards.
//! - [`classify`] is the single place that turns a source into an upload, a URL or a path.
//! - Plain strings are split by an explicit absolute-URL predicate, never by a failed parse.

use std::fmt::{self, Debug, Formatter};
use std::io;

use futures_util::future::BoxFuture;
use tokio::io::AsyncRead;
use url::Url;

use crate::error::{DelugeError, DelugeResult};
use crate::transport::{BoxedReader, MultipartFile, UploadContent};

/// Multipart field name expected by the upload endpoint.
pub const UPLOAD_FIELD: &str = "file";
/// File name reported for uploads that do not carry their own.
pub const UPLOAD_FILE_NAME: &str = "upload.torrent";

/// Anything that can be turned into a torrent the daemon can add.
pub enum TorrentSource {
    /// Raw `.torrent` content.
    Bytes(Vec<u8>),
    /// Readable byte stream with `.torrent` content.
    Stream(BoxedReader),
    /// Named file content, uploaded under its own name.
    FileLike {
        /// File name reported to the daemon.
        name: String,
        /// File content.
        bytes: Vec<u8>,
    },
    /// Content that is still being produced, such as an in-flight file read.
    Pending(BoxFuture<'static, io::Result<Vec<u8>>>),
    /// Remote location the daemon should fetch (HTTP(S) or magnet).
    Url(String),
    /// Server-side path already known to the daemon, e.g. from a prior upload.
    Path(String),
}

impl TorrentSource {
    /// Wrap an async reader.
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Self::Stream(Box::pin(reader))
    }

    /// Wrap a future that resolves to torrent content.
    pub fn pending<F>(content: F) -> Self
    where
        F: Future<Output = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self::Pending(Box::pin(content))
    }

    /// Named file content.
    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::FileLike {
            name: name.into(),
            bytes,
        }
    }

    /// Tag a string as a URL when it matches the absolute-URL grammar, as a
    /// server-side path otherwise.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if is_absolute_url(&text) {
            Self::Url(text)
        } else {
            Self::Path(text)
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Stream(_) => "stream",
            Self::FileLike { .. } => "file",
            Self::Pending(_) => "pending",
            Self::Url(_) => "url",
            Self::Path(_) => "path",
        }
    }
}

impl Debug for TorrentSource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => formatter.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::FileLike { name, bytes } => formatter
                .debug_struct("FileLike")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            Self::Url(url) => formatter.debug_tuple("Url").field(url).finish(),
            Self::Path(path) => formatter.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) | Self::Pending(_) => formatter.write_str(self.kind()),
        }
    }
}

impl From<Vec<u8>> for TorrentSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for TorrentSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Url> for TorrentSource {
    fn from(url: Url) -> Self {
        Self::Url(url.into())
    }
}

impl From<&str> for TorrentSource {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for TorrentSource {
    fn from(text: String) -> Self {
        Self::from_text(text)
    }
}

/// Whether `text` parses as an absolute URL (scheme included, e.g. `http:` or `magnet:`).
#[must_use]
pub fn is_absolute_url(text: &str) -> bool {
    Url::parse(text).is_ok()
}

/// A source reduced to the one thing the submitter needs to do with it.
#[derive(Debug)]
pub(crate) enum ResolvedSource {
    Upload(MultipartFile),
    Url(String),
    Path(String),
}

/// Await pending content and collapse the source into an upload, a URL or a path.
pub(crate) async fn classify(source: TorrentSource) -> DelugeResult<ResolvedSource> {
    let resolved = match source {
        TorrentSource::Pending(content) => {
            let bytes = content
                .await
                .map_err(|source| DelugeError::SourceRead { source })?;
            ResolvedSource::Upload(upload(UPLOAD_FILE_NAME, UploadContent::Bytes(bytes)))
        }
        TorrentSource::Bytes(bytes) => {
            ResolvedSource::Upload(upload(UPLOAD_FILE_NAME, UploadContent::Bytes(bytes)))
        }
        TorrentSource::Stream(reader) => {
            ResolvedSource::Upload(upload(UPLOAD_FILE_NAME, UploadContent::Stream(reader)))
        }
        TorrentSource::FileLike { name, bytes } => {
            ResolvedSource::Upload(upload(&name, UploadContent::Bytes(bytes)))
        }
        TorrentSource::Url(url) => ResolvedSource::Url(url),
        TorrentSource::Path(path) => ResolvedSource::Path(path),
    };
    Ok(resolved)
}

fn upload(file_name: &str, content: UploadContent) -> MultipartFile {
    MultipartFile {
        field: UPLOAD_FIELD.to_string(),
        file_name: file_name.to_string(),
        content,
    }
}
