use std::path::Path;

use anyhow::anyhow;
use deluge_rpc::{TorrentConfig, TorrentSource};
use tokio::fs::File;

use crate::cli::{AddArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_error};
use crate::output::{render_torrent_record, render_value};

const LOCAL_FILE_PREFIX: char = '@';

pub(crate) async fn handle_status(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let record = ctx
        .deluge
        .get_torrent_record()
        .await
        .map_err(classify_error)?;
    render_torrent_record(&record, format)
}

pub(crate) async fn handle_add(
    ctx: &AppContext,
    args: AddArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let source = resolve_source(&args.source).await?;
    let config = build_config(&args);
    tracing::info!(source = source.kind(), "adding torrent");

    let result = ctx
        .deluge
        .add_torrent(source, config)
        .await
        .map_err(classify_error)?;
    match format {
        OutputFormat::Json => render_value(&result, format),
        OutputFormat::Table => {
            println!("Torrent submission accepted: {result}");
            Ok(())
        }
    }
}

/// Local files (forced with `@` or found on disk) are streamed; anything else
/// is a URL or a daemon-side path.
pub(crate) async fn resolve_source(raw: &str) -> CliResult<TorrentSource> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CliError::validation("source must not be empty"));
    }

    let local = raw
        .strip_prefix(LOCAL_FILE_PREFIX)
        .or_else(|| Path::new(raw).is_file().then_some(raw));
    let Some(path) = local else {
        return Ok(TorrentSource::from_text(raw));
    };

    let file = File::open(path).await.map_err(|err| {
        CliError::failure(anyhow!("failed to open torrent file '{path}': {err}"))
    })?;
    Ok(TorrentSource::stream(file))
}

pub(crate) fn build_config(args: &AddArgs) -> TorrentConfig {
    TorrentConfig {
        download_location: args.download_location.clone(),
        add_paused: args.paused.then_some(true),
        max_connections: args.max_connections,
        max_download_speed: args.max_download_speed,
        max_upload_speed: args.max_upload_speed,
        max_upload_slots: args.max_upload_slots,
        prioritize_first_last_pieces: args.prioritize_first_last.then_some(true),
        cookie: args.cookie.clone(),
        ..TorrentConfig::default()
    }
}
