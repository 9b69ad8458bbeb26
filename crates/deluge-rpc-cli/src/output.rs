//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use deluge_rpc::TorrentRecord;
use deluge_rpc::models::TorrentStatus;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_value(value: &Value, format: OutputFormat) -> CliResult<()> {
    match (format, value) {
        (OutputFormat::Table, Value::String(text)) => println!("{text}"),
        (OutputFormat::Table, Value::Null) => println!("ok"),
        _ => println!("{}", to_pretty_json(value)?),
    }
    Ok(())
}

pub(crate) fn render_torrent_record(record: &TorrentRecord, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_pretty_json(record)?),
        OutputFormat::Table => print!("{}", torrent_table(record)),
    }
    Ok(())
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

#[must_use]
pub(crate) fn torrent_table(record: &TorrentRecord) -> String {
    let mut out = String::new();
    if !record.connected {
        out.push_str("web ui is not connected to a daemon\n");
        return out;
    }

    out.push_str(&format!(
        "{:<40} {:<12} {:>7} {:>6} {:>21} NAME\n",
        "ID", "STATE", "PROG", "RATIO", "DONE"
    ));
    let mut torrents: Vec<(&String, &TorrentStatus)> = record
        .torrents
        .iter()
        .flat_map(|torrents| torrents.iter())
        .collect();
    torrents.sort_by(|left, right| {
        queue_position(left.1)
            .cmp(&queue_position(right.1))
            .then(left.0.cmp(right.0))
    });
    for (id, status) in torrents {
        out.push_str(&torrent_row(id, status));
    }

    if let Some(stats) = &record.stats {
        out.push_str(&format!(
            "rates: down {}/s / up {}/s, connections: {}\n",
            format_bytes(rate_to_bytes(stats.download_rate.unwrap_or_default())),
            format_bytes(rate_to_bytes(stats.upload_rate.unwrap_or_default())),
            stats.num_connections.unwrap_or_default()
        ));
    }
    out
}

fn torrent_row(id: &str, status: &TorrentStatus) -> String {
    let done = format!(
        "{}/{}",
        format_bytes(clamp_bytes(status.total_done.unwrap_or_default())),
        format_bytes(clamp_bytes(status.total_wanted.unwrap_or_default()))
    );
    format!(
        "{:<40} {:<12} {:>6.1}% {:>6.2} {:>21} {}\n",
        id,
        status.state.as_deref().unwrap_or("-"),
        status.progress.unwrap_or_default(),
        status.ratio.unwrap_or_default(),
        done,
        status.name.as_deref().unwrap_or_default()
    )
}

/// Unqueued torrents (`-1` or unknown) sort after queued ones.
fn queue_position(status: &TorrentStatus) -> i64 {
    status
        .queue
        .filter(|queue| *queue >= 0)
        .unwrap_or(i64::MAX)
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn clamp_bytes(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rate_to_bytes(rate: f64) -> u64 {
    if rate.is_finite() && rate > 0.0 {
        rate.round() as u64
    } else {
        0
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
