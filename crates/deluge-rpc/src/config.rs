//! Connection settings for a Deluge web endpoint.
//!
//! # Design
//! - Base URLs are normalised once, here, to always end with `/` so endpoint joins stay relative.
//! - Environment loading goes through a lookup closure so tests never touch process state.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Environment variable holding the web UI base URL.
pub const ENV_BASE_URL: &str = "DELUGE_WEB_URL";
/// Environment variable holding the web UI password.
pub const ENV_PASSWORD: &str = "DELUGE_WEB_PASSWORD";
/// Environment variable holding the HTTP timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "DELUGE_HTTP_TIMEOUT_SECS";
/// Default HTTP timeout applied by the bundled transport.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while building a [`DelugeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Base URL failed to parse.
    #[error("invalid base URL")]
    InvalidBaseUrl {
        /// Raw input supplied by the caller.
        value: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// Base URL parsed but cannot host the web endpoints.
    #[error("unsupported base URL scheme")]
    UnsupportedScheme {
        /// Raw input supplied by the caller.
        value: String,
    },
    /// A required environment variable was not set.
    #[error("missing environment variable")]
    MissingVariable {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// Timeout value was not a positive integer.
    #[error("invalid timeout")]
    InvalidTimeout {
        /// Raw input supplied by the caller.
        value: String,
    },
}

/// Settings needed to reach and authenticate against a Deluge web UI.
#[derive(Clone)]
pub struct DelugeConfig {
    base_url: Url,
    password: String,
    timeout: Duration,
}

impl DelugeConfig {
    /// Build a configuration from a base URL and the web UI password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL is malformed or not HTTP(S).
    pub fn new(base_url: &str, password: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Override the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load settings from `DELUGE_WEB_URL`, `DELUGE_WEB_PASSWORD` and
    /// `DELUGE_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL is missing or invalid, or the
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// A missing password is treated as empty.
    ///
    /// # Errors
    ///
    /// See [`DelugeConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::MissingVariable {
            name: ENV_BASE_URL,
        })?;
        let password = lookup(ENV_PASSWORD).unwrap_or_default();
        let config = Self::new(&base_url, password)?;

        match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => Ok(config.with_timeout(parse_timeout(&raw)?)),
            None => Ok(config),
        }
    }

    /// Normalised base URL, always ending with `/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Web UI password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// HTTP timeout for the bundled transport.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an endpoint (`json`, `upload`) relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the join fails.
    pub fn endpoint(&self, name: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(name)
            .map_err(|source| ConfigError::InvalidBaseUrl {
                value: self.base_url.to_string(),
                source,
            })
    }
}

impl Debug for DelugeConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DelugeConfig")
            .field("base_url", &self.base_url.as_str())
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Parse a base URL and make sure it ends with a path separator.
///
/// # Errors
///
/// Returns [`ConfigError`] when the input is not an absolute HTTP(S) URL.
pub fn normalize_base_url(input: &str) -> Result<Url, ConfigError> {
    let mut raw = input.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
        value: input.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            value: input.to_string(),
        });
    }
    Ok(url)
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn base_url_gains_trailing_separator() {
        let url = normalize_base_url("http://nas.local:8112").expect("valid url");
        assert_eq!(url.as_str(), "http://nas.local:8112/");

        let nested = normalize_base_url("https://example.com/deluge").expect("valid url");
        assert_eq!(nested.as_str(), "https://example.com/deluge/");

        let untouched = normalize_base_url("https://example.com/deluge/").expect("valid url");
        assert_eq!(untouched.as_str(), "https://example.com/deluge/");
    }

    #[test]
    fn endpoints_join_below_nested_base() {
        let config = DelugeConfig::new("https://example.com/deluge", "pw").expect("config");
        assert_eq!(
            config.endpoint("json").expect("join").as_str(),
            "https://example.com/deluge/json"
        );
        assert_eq!(
            config.endpoint("upload").expect("join").as_str(),
            "https://example.com/deluge/upload"
        );
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        assert!(matches!(
            normalize_base_url("localhost:8112"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            normalize_base_url("/deluge"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            normalize_base_url("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn lookup_reads_url_password_and_timeout() {
        let config = DelugeConfig::from_lookup(lookup_from(&[
            (ENV_BASE_URL, "http://127.0.0.1:8112"),
            (ENV_PASSWORD, "deluge"),
            (ENV_TIMEOUT_SECS, "30"),
        ]))
        .expect("config");
        assert_eq!(config.base_url().as_str(), "http://127.0.0.1:8112/");
        assert_eq!(config.password(), "deluge");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn lookup_defaults_password_and_timeout() {
        let config = DelugeConfig::from_lookup(lookup_from(&[(ENV_BASE_URL, "http://h:8112")]))
            .expect("config");
        assert_eq!(config.password(), "");
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn lookup_requires_url_and_valid_timeout() {
        assert!(matches!(
            DelugeConfig::from_lookup(lookup_from(&[])),
            Err(ConfigError::MissingVariable { name }) if name == ENV_BASE_URL
        ));
        assert!(matches!(
            DelugeConfig::from_lookup(lookup_from(&[
                (ENV_BASE_URL, "http://h:8112"),
                (ENV_TIMEOUT_SECS, "0"),
            ])),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = DelugeConfig::new("http://h:8112", "hunter2").expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
