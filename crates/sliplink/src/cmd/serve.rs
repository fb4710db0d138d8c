use std::io::BufRead;
use std::sync::{mpsc, Arc};

use sliplink_link::{LinkLayer, LinkLayerConfig};
use tracing::{info, warn};

use crate::cmd::{pump, ServeArgs};
use crate::exit::{io_error, link_error, CliResult};
use crate::output::{print_datagram, print_stats, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = LinkLayerConfig::from_file(&args.config)
        .map_err(|err| link_error("config load failed", err))?;
    let (tx, rx) = mpsc::channel();
    let layer = Arc::new(
        config
            .open_with_receiver(move |datagram| {
                let _ = tx.send(datagram);
            })
            .map_err(|err| link_error("link setup failed", err))?,
    );
    info!(neighbors = ?layer.neighbors(), "serving");

    let outbound = Arc::clone(&layer);
    std::thread::Builder::new()
        .name("sliplink-stdin".to_string())
        .spawn(move || forward_stdin(&outbound))
        .map_err(|err| io_error("failed starting stdin reader", err))?;

    let code = pump(rx, args.count, |datagram| {
        print_datagram(&datagram, "link", format);
        Ok(())
    })?;

    print_stats(&layer.stats(), format);
    Ok(code)
}

/// Send each stdin line `<neighbor> <payload>` to that neighbor.
fn forward_stdin(layer: &LinkLayer) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "stdin read failed; no longer forwarding");
                return;
            }
        };
        let Some((next_hop, payload)) = parse_line(&line) else {
            continue;
        };
        if let Err(err) = layer.send(payload.as_bytes(), next_hop) {
            warn!(next_hop, error = %err, "send failed");
        }
    }
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start().trim_end_matches('\r');
    if line.trim_end().is_empty() {
        return None;
    }
    Some(line.split_once(' ').unwrap_or((line, "")))
}
