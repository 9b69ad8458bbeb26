//! HTTP transport boundary for the Deluge web client.
//!
//! # Design
//! - The client only depends on [`Transport`]: send one POST, get status, headers and a JSON body.
//! - [`ReqwestTransport`] is the default adapter; tests substitute recording stubs.
//! - Timeouts and cancellation are owned by the adapter, never by the client.

use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use url::Url;

/// Header carrying the daemon session cookie on outgoing requests.
pub const COOKIE_HEADER: &str = "cookie";
/// Header carrying the daemon session cookie on login responses.
pub const SET_COOKIE_HEADER: &str = "set-cookie";

/// Readable byte stream accepted as upload content.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Errors raised by a transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Building the underlying HTTP client failed.
    #[error("failed to build HTTP client")]
    Build {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Sending the request or reading the response failed.
    #[error("http request failed")]
    Request {
        /// Target URL of the failed request.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Response body could not be parsed as JSON.
    #[error("response body was not valid JSON")]
    Decode {
        /// Target URL of the request.
        url: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// Failure raised by a custom transport implementation.
    #[error("transport failure")]
    Other {
        /// Adapter-specific error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Body of an outgoing request.
#[derive(Debug)]
pub enum RequestBody {
    /// JSON document sent with `Content-Type: application/json`.
    Json(Value),
    /// Multipart form carrying a single file field.
    Multipart(MultipartFile),
}

/// Single file field of a multipart upload.
#[derive(Debug)]
pub struct MultipartFile {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// File content.
    pub content: UploadContent,
}

/// Content of an uploaded file.
pub enum UploadContent {
    /// In-memory buffer.
    Bytes(Vec<u8>),
    /// Byte stream consumed while the request is sent.
    Stream(BoxedReader),
}

impl Debug for UploadContent {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => formatter
                .debug_struct("Bytes")
                .field("len", &bytes.len())
                .finish(),
            Self::Stream(_) => formatter.write_str("Stream"),
        }
    }
}

/// Outgoing POST request handed to a [`Transport`].
#[derive(Debug)]
pub struct HttpRequest {
    /// Absolute target URL.
    pub url: Url,
    /// Extra request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Request payload.
    pub body: RequestBody,
}

/// Response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as `(name, value)` pairs, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body; `Null` when the body was empty.
    pub body: Value,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Values of every header matching `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Minimal HTTP contract the client needs from its environment.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a POST request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the request cannot be delivered or
    /// the response body cannot be decoded.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Build { source })?;
        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest` client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest { url, headers, body } = request;
        let target = url.to_string();

        let mut builder = self.client.post(url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder = match body {
            RequestBody::Json(payload) => builder.json(&payload),
            RequestBody::Multipart(file) => builder.multipart(multipart_form(file)),
        };

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: target.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                url: target.clone(),
                source,
            })?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|source| TransportError::Decode { url: target, source })?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn multipart_form(file: MultipartFile) -> Form {
    let MultipartFile {
        field,
        file_name,
        content,
    } = file;
    let part = match content {
        UploadContent::Bytes(bytes) => Part::bytes(bytes),
        UploadContent::Stream(reader) => Part::stream(Body::wrap_stream(ReaderStream::new(reader))),
    };
    Form::new().part(field, part.file_name(file_name))
}
