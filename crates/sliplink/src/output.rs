use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sliplink_link::{LinkStats, NeighborAddr};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DatagramOutput<'a> {
    source: &'a str,
    size: usize,
    text: Option<&'a str>,
    hex: String,
    timestamp: String,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    neighbor: &'a str,
    frames_sent: u64,
    bytes_sent: u64,
    frames_received: u64,
    frames_dropped: u64,
    malformed: u64,
    oversized: u64,
    residual_len: usize,
}

pub fn print_datagram(datagram: &[u8], source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DatagramOutput {
                source,
                size: datagram.len(),
                text: std::str::from_utf8(datagram).ok(),
                hex: to_hex(datagram),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOURCE", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    source.to_string(),
                    datagram.len().to_string(),
                    payload_preview(datagram),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "source={} size={} payload={}",
                source,
                datagram.len(),
                payload_preview(datagram)
            );
        }
        OutputFormat::Raw => print_raw(datagram),
    }
}

pub fn print_stats(stats: &[(NeighborAddr, LinkStats)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = stats
                .iter()
                .map(|(neighbor, s)| StatsOutput {
                    neighbor: neighbor.as_str(),
                    frames_sent: s.frames_sent,
                    bytes_sent: s.bytes_sent,
                    frames_received: s.frames_received,
                    frames_dropped: s.frames_dropped,
                    malformed: s.malformed,
                    oversized: s.oversized,
                    residual_len: s.residual_len,
                })
                .collect();
            eprintln!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "NEIGHBOR", "SENT", "BYTES", "RECEIVED", "DROPPED", "MALFORMED", "OVERSIZED",
                ]);
            for (neighbor, s) in stats {
                table.add_row(vec![
                    neighbor.to_string(),
                    s.frames_sent.to_string(),
                    s.bytes_sent.to_string(),
                    s.frames_received.to_string(),
                    s.frames_dropped.to_string(),
                    s.malformed.to_string(),
                    s.oversized.to_string(),
                ]);
            }
            eprintln!("{table}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("0x{}", to_hex(payload)),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
