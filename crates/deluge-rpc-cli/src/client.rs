//! Shared client wiring and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use deluge_rpc::{DelugeClient, DelugeConfig, DelugeError, ReqwestTransport};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Dependencies constructed from environment flags and CLI options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
}

impl CliDependencies {
    /// Construct an HTTP client that tags every request with the trace id.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        if cli.timeout == 0 {
            return Err(CliError::validation("timeout must be at least one second"));
        }

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self { client })
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) deluge: DelugeClient,
}

impl AppContext {
    pub(crate) fn from_cli(cli: &Cli, deps: &CliDependencies) -> CliResult<Self> {
        let config = DelugeConfig::new(&cli.url, cli.password.clone())
            .map_err(|err| CliError::validation(format!("invalid --url '{}': {err}", cli.url)))?
            .with_timeout(Duration::from_secs(cli.timeout));
        let transport = ReqwestTransport::from_client(deps.client.clone());
        let deluge = DelugeClient::with_transport(config, transport).map_err(classify_error)?;
        Ok(Self { deluge })
    }
}

/// Classify a library error into a CLI error.
pub(crate) fn classify_error(err: DelugeError) -> CliError {
    match err {
        DelugeError::HostIndexOutOfRange { index, available } => CliError::validation(format!(
            "host index {index} is out of range ({available} hosts configured)"
        )),
        DelugeError::Config { source } => CliError::validation(source.to_string()),
        DelugeError::Rpc { method, error } => {
            CliError::failure(anyhow!("{method} failed: {error}"))
        }
        DelugeError::UnexpectedStatus { endpoint, status } => {
            CliError::failure(anyhow!("request to /{endpoint} failed with status {status}"))
        }
        other => CliError::failure(other),
    }
}
