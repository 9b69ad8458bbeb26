//! Argument parsing and command dispatch.

use clap::{Args, Parser, Subcommand, ValueEnum};
use deluge_rpc::HostRef;
use deluge_rpc::config::{DEFAULT_TIMEOUT_SECS, ENV_BASE_URL, ENV_PASSWORD, ENV_TIMEOUT_SECS};
use deluge_rpc_telemetry::{LogFormat, LoggingConfig, init_logging};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliResult};
use crate::commands::rpc::{handle_call, handle_connect};
use crate::commands::torrents::{handle_add, handle_status};

const DEFAULT_WEB_URL: &str = "http://127.0.0.1:8112/";
const DEFAULT_PASSWORD: &str = "deluge";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("deluge_rpc", trace_id = %trace_id, command = command_name);

    let result = async {
        let deps = CliDependencies::from_cli(&cli, &trace_id)?;
        dispatch(cli, &deps).await
    }
    .instrument(span)
    .await;

    match result {
        Ok(()) => 0,
        Err(err) => {
            let exit_code = err.exit_code();
            tracing::debug!(trace_id = %trace_id, exit_code, "command failed");
            eprintln!("error: {}", err.display_message());
            exit_code
        }
    }
}

fn install_logging(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: {err}");
    }
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let ctx = AppContext::from_cli(&cli, deps)?;

    match cli.command {
        Command::Call(args) => handle_call(&ctx, args, cli.output).await,
        Command::Connect(args) => handle_connect(&ctx, args, cli.output).await,
        Command::Status => handle_status(&ctx, cli.output).await,
        Command::Add(args) => handle_add(&ctx, args, cli.output).await,
    }
}

#[derive(Parser)]
#[command(name = "deluge-rpc", about = "Command-line client for the Deluge web UI")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = ENV_BASE_URL, default_value = DEFAULT_WEB_URL)]
    pub(crate) url: String,
    #[arg(
        long,
        global = true,
        env = ENV_PASSWORD,
        default_value = DEFAULT_PASSWORD,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub(crate) password: String,
    #[arg(
        long,
        global = true,
        env = ENV_TIMEOUT_SECS,
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, env = "DELUGE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Invoke a JSON-RPC method and print its result.
    Call(CallArgs),
    /// Connect the web UI to a daemon host.
    Connect(ConnectArgs),
    /// Show the torrent table.
    Status,
    /// Add a torrent from a URL, a daemon-side path, or a local file.
    Add(AddArgs),
}

#[derive(Args)]
pub(crate) struct CallArgs {
    #[arg(help = "Remote method, e.g. core.get_session_state")]
    pub(crate) method: String,
    #[arg(help = "Positional parameters as a JSON array")]
    pub(crate) params: Option<String>,
    #[arg(long, help = "Skip the session check before calling")]
    pub(crate) no_auth: bool,
}

#[derive(Args)]
pub(crate) struct ConnectArgs {
    #[arg(long, default_value = "0", help = "Host index or host id from web.get_hosts")]
    pub(crate) host: HostRef,
}

#[derive(Args, Default)]
pub(crate) struct AddArgs {
    #[arg(help = "URL, daemon-side path, or local .torrent file (prefix with @ to force)")]
    pub(crate) source: String,
    #[arg(long)]
    pub(crate) download_location: Option<String>,
    #[arg(long)]
    pub(crate) paused: bool,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max_connections: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max_download_speed: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max_upload_speed: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max_upload_slots: Option<i64>,
    #[arg(long)]
    pub(crate) prioritize_first_last: bool,
    #[arg(long, help = "Cookie sent when the daemon fetches a URL source")]
    pub(crate) cookie: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input
        .parse::<LogFormat>()
        .map_err(|_| format!("unknown log format '{input}' (expected json or pretty)"))
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Call(_) => "call",
        Command::Connect(_) => "connect",
        Command::Status => "status",
        Command::Add(_) => "add",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn defaults_point_at_local_web_ui() {
        let cli = parse(&["deluge-rpc", "status"]);
        assert_eq!(cli.url, DEFAULT_WEB_URL);
        assert_eq!(cli.password, DEFAULT_PASSWORD);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.output, OutputFormat::Table);
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
        assert!(cli.log_format.is_none());
        assert_eq!(command_label(&cli.command), "status");
    }

    #[test]
    fn add_accepts_negative_limits_and_flags() {
        let cli = parse(&[
            "deluge-rpc",
            "--output",
            "json",
            "add",
            "@./debian.torrent",
            "--download-location",
            "/srv/media",
            "--paused",
            "--max-connections",
            "-1",
            "--max-upload-slots",
            "4",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Add(args) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.source, "@./debian.torrent");
        assert_eq!(args.download_location.as_deref(), Some("/srv/media"));
        assert!(args.paused);
        assert_eq!(args.max_connections, Some(-1));
        assert_eq!(args.max_upload_slots, Some(4));
    }

    #[test]
    fn connect_host_parses_index_or_id() {
        let cli = parse(&["deluge-rpc", "connect"]);
        assert!(matches!(cli.command, Command::Connect(ConnectArgs { host: HostRef::Index(0) })));

        let cli = parse(&["deluge-rpc", "connect", "--host", "c1f0a3"]);
        let Command::Connect(args) = cli.command else {
            panic!("expected connect command");
        };
        assert_eq!(args.host, HostRef::Id("c1f0a3".to_string()));
    }

    #[test]
    fn log_format_is_validated() {
        let cli = parse(&["deluge-rpc", "--log-format", "json", "status"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["deluge-rpc", "--log-format", "xml", "status"]).is_err());
    }

    #[test]
    fn command_label_matches_variants() {
        let cli = parse(&["deluge-rpc", "call", "web.connected", "--no-auth"]);
        assert_eq!(command_label(&cli.command), "call");
        let Command::Call(args) = cli.command else {
            panic!("expected call command");
        };
        assert_eq!(args.method, "web.connected");
        assert!(args.params.is_none());
        assert!(args.no_auth);
    }
}
