//! Wire shapes of the Deluge web JSON-RPC protocol.
//!
//! Requests are `{method, params, id}` posted to `<base>json`; responses are
//! `{result, error, id}` with exactly one of `result`/`error` non-null.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Relative path of the JSON-RPC endpoint.
pub const RPC_ENDPOINT: &str = "json";
/// Relative path of the torrent upload endpoint.
pub const UPLOAD_ENDPOINT: &str = "upload";

/// Checks whether the current cookie still maps to a live session.
pub const AUTH_CHECK_SESSION: &str = "auth.check_session";
/// Exchanges the web password for a session cookie.
pub const AUTH_LOGIN: &str = "auth.login";
/// Lists the daemon hosts configured in the web UI.
pub const WEB_GET_HOSTS: &str = "web.get_hosts";
/// Connects the web UI to a daemon host.
pub const WEB_CONNECT: &str = "web.connect";
/// Returns the torrent table plus filter and session statistics.
pub const WEB_UPDATE_UI: &str = "web.update_ui";
/// Asks the web UI to fetch a torrent from a URL.
pub const WEB_DOWNLOAD_TORRENT_FROM_URL: &str = "web.download_torrent_from_url";
/// Adds one or more torrents from server-side paths or URLs.
pub const WEB_ADD_TORRENTS: &str = "web.add_torrents";

/// Outgoing call envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest<'a> {
    /// Remote procedure name.
    pub method: &'a str,
    /// Positional arguments.
    pub params: Vec<Value>,
    /// Request identifier snapshot taken at send time.
    pub id: u32,
}

impl From<RpcRequest<'_>> for Value {
    fn from(request: RpcRequest<'_>) -> Self {
        json!({
            "method": request.method,
            "params": request.params,
            "id": request.id,
        })
    }
}

/// Incoming response envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RpcResponse {
    /// Success payload; `None` when null or absent.
    #[serde(default)]
    pub result: Option<Value>,
    /// Daemon error value; `None` when null or absent.
    #[serde(default)]
    pub error: Option<Value>,
}

/// Body returned by the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadResponse {
    /// Whether the daemon stored the uploaded files.
    #[serde(default)]
    pub success: bool,
    /// Server-side paths assigned to the uploaded files.
    #[serde(default)]
    pub files: Vec<Value>,
}

/// JSON truthiness as the web UI evaluates RPC results.
///
/// `null`, `false`, `0` and `""` are falsy; everything else, including empty
/// arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Session token carried by a `Set-Cookie` header: the first directive, verbatim.
#[must_use]
pub fn session_cookie_from(set_cookie: &str) -> &str {
    set_cookie
        .split_once(';')
        .map_or(set_cookie, |(directive, _)| directive)
}
