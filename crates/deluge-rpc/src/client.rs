//! Session-aware JSON-RPC client for the Deluge web UI.
//!
//! # Design
//! - One [`DelugeClient`] owns one session: cookie and request counter behind a mutex that is
//!   never held across a network round trip.
//! - Logins are serialised through a separate async gate so concurrent callers cannot race
//!   to overwrite the cookie.
//! - Every failure is surfaced to the caller as-is; nothing in here retries.

use std::fmt::{self, Debug, Formatter};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DelugeConfig;
use crate::error::{DelugeError, DelugeResult};
use crate::models::HostRef;
use crate::protocol::{
    AUTH_CHECK_SESSION, AUTH_LOGIN, RPC_ENDPOINT, RpcRequest, RpcResponse, UPLOAD_ENDPOINT,
    WEB_CONNECT, WEB_GET_HOSTS, is_truthy, session_cookie_from,
};
use crate::session::Session;
use crate::transport::{
    COOKIE_HEADER, HttpRequest, HttpResponse, ReqwestTransport, RequestBody, SET_COOKIE_HEADER,
    Transport,
};

/// Client for one Deluge web UI endpoint.
pub struct DelugeClient<T = ReqwestTransport> {
    transport: T,
    base_url: Url,
    rpc_url: Url,
    pub(crate) upload_url: Url,
    secret: String,
    pub(crate) session: Mutex<Session>,
    auth_gate: Mutex<()>,
}

impl<T> Debug for DelugeClient<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DelugeClient")
            .field("base_url", &self.base_url.as_str())
            .field("secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl DelugeClient<ReqwestTransport> {
    /// Build a client for `base_url` using the bundled `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Config`] for an invalid URL and
    /// [`DelugeError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, secret: impl Into<String>) -> DelugeResult<Self> {
        Self::from_config(DelugeConfig::new(base_url, secret)?)
    }

    /// Build a client from a prepared configuration.
    ///
    /// # Errors
    ///
    /// See [`DelugeClient::new`].
    pub fn from_config(config: DelugeConfig) -> DelugeResult<Self> {
        let transport =
            ReqwestTransport::new(config.timeout()).map_err(|source| DelugeError::Transport {
                endpoint: RPC_ENDPOINT,
                source,
            })?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> DelugeClient<T> {
    /// Build a client over a caller-provided transport.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Config`] if the endpoints cannot be derived from the base URL.
    pub fn with_transport(config: DelugeConfig, transport: T) -> DelugeResult<Self> {
        Ok(Self {
            transport,
            rpc_url: config.endpoint(RPC_ENDPOINT)?,
            upload_url: config.endpoint(UPLOAD_ENDPOINT)?,
            base_url: config.base_url().clone(),
            secret: config.password().to_string(),
            session: Mutex::new(Session::default()),
            auth_gate: Mutex::new(()),
        })
    }

    /// Normalised base URL of the web UI.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session cookie currently attached to requests; empty before the first login.
    pub async fn session_cookie(&self) -> String {
        self.session.lock().await.cookie().to_string()
    }

    /// Invoke a remote procedure and return its `result` verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Rpc`] carrying the daemon's error value when the
    /// envelope reports one, or a transport/status error when delivery fails.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> DelugeResult<Value> {
        let (result, _) = self.exchange(method, params).await?;
        Ok(result)
    }

    /// Invoke a remote procedure and decode its result.
    ///
    /// # Errors
    ///
    /// As [`DelugeClient::call`], plus [`DelugeError::Decode`] when the result
    /// does not match `R`.
    pub async fn call_as<R>(&self, method: &str, params: Vec<Value>) -> DelugeResult<R>
    where
        R: DeserializeOwned,
    {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|source| DelugeError::Decode {
            method: method.to_string(),
            source,
        })
    }

    /// Make sure subsequent calls carry a valid session cookie, logging in if needed.
    ///
    /// A still-valid session costs a single `auth.check_session` round trip.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::Authentication`] when the daemon rejects the password.
    pub async fn ensure_authenticated(&self) -> DelugeResult<()> {
        let _gate = self.auth_gate.lock().await;

        let valid = self.call(AUTH_CHECK_SESSION, Vec::new()).await?;
        if is_truthy(&valid) {
            debug!("deluge session still valid");
            return Ok(());
        }

        let (accepted, response) = self
            .exchange(AUTH_LOGIN, vec![Value::String(self.secret.clone())])
            .await?;
        if !is_truthy(&accepted) {
            warn!(base_url = %self.base_url, "deluge rejected login");
            return Err(DelugeError::Authentication);
        }

        let cookie = response
            .header_values(SET_COOKIE_HEADER)
            .next()
            .map(|header| session_cookie_from(header).to_string())
            .ok_or(DelugeError::MalformedResponse {
                endpoint: AUTH_LOGIN,
                reason: "login response carried no session cookie",
            })?;
        self.session.lock().await.set_cookie(cookie);
        info!(base_url = %self.base_url, "authenticated with deluge web");
        Ok(())
    }

    /// Connect the web UI to a daemon host, by list index or by host id.
    ///
    /// # Errors
    ///
    /// Returns [`DelugeError::HostIndexOutOfRange`] for an index past the end
    /// of the host list, or any error raised by the underlying calls.
    pub async fn connect(&self, host: impl Into<HostRef>) -> DelugeResult<Value> {
        let host_id = match host.into() {
            HostRef::Id(id) => Value::String(id),
            HostRef::Index(index) => {
                let hosts = self.call(WEB_GET_HOSTS, Vec::new()).await?;
                resolve_host_id(&hosts, index)?
            }
        };
        debug!(host = %host_id, "connecting web ui to daemon host");
        self.call(WEB_CONNECT, vec![host_id]).await
    }

    /// Send one envelope and return the unwrapped result with the raw response.
    async fn exchange(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> DelugeResult<(Value, HttpResponse)> {
        let (id, cookie) = {
            let mut session = self.session.lock().await;
            (session.take_request_id(), session.cookie().to_string())
        };
        debug!(method, request_id = id, "dispatching deluge rpc call");

        let request = HttpRequest {
            url: self.rpc_url.clone(),
            headers: vec![(COOKIE_HEADER.to_string(), cookie)],
            body: RequestBody::Json(RpcRequest { method, params, id }.into()),
        };

        let mut response = self.send(request, RPC_ENDPOINT).await?;
        let envelope: RpcResponse =
            serde_json::from_value(response.body.take()).map_err(|_| {
                DelugeError::MalformedResponse {
                    endpoint: RPC_ENDPOINT,
                    reason: "response body is not an rpc envelope",
                }
            })?;

        if let Some(error) = envelope.error {
            debug!(method, request_id = id, "deluge rpc call returned an error");
            return Err(DelugeError::Rpc {
                method: method.to_string(),
                error,
            });
        }
        Ok((envelope.result.unwrap_or(Value::Null), response))
    }

    /// Deliver a request and reject non-2xx responses.
    pub(crate) async fn send(
        &self,
        request: HttpRequest,
        endpoint: &'static str,
    ) -> DelugeResult<HttpResponse> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| DelugeError::Transport { endpoint, source })?;
        if !response.is_success() {
            return Err(DelugeError::UnexpectedStatus {
                endpoint,
                status: response.status,
            });
        }
        Ok(response)
    }
}

/// Identifier of the host at `index` in a `web.get_hosts` listing (first tuple element).
fn resolve_host_id(hosts: &Value, index: usize) -> DelugeResult<Value> {
    let hosts = hosts.as_array().ok_or(DelugeError::MalformedResponse {
        endpoint: WEB_GET_HOSTS,
        reason: "host list is not an array",
    })?;
    let entry = hosts.get(index).ok_or(DelugeError::HostIndexOutOfRange {
        index,
        available: hosts.len(),
    })?;
    entry
        .get(0)
        .cloned()
        .ok_or(DelugeError::MalformedResponse {
            endpoint: WEB_GET_HOSTS,
            reason: "host entry has no identifier",
        })
}
