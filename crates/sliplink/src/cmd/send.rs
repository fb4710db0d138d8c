use std::fs;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use sliplink_frame::FrameConfig;
use sliplink_link::Link;
use sliplink_transport::UnixDomainSocket;

use crate::cmd::SendArgs;
use crate::exit::{
    io_error, link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_datagram, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let transport = UnixDomainSocket::connect(&args.path)
        .map_err(|err| transport_error("connect failed", err))?;
    let (tx, rx) = mpsc::channel();
    let link = Link::with_receiver(transport, FrameConfig::default(), move |datagram| {
        let _ = tx.send(datagram);
    })
    .map_err(|err| link_error("link setup failed", err))?;

    link.send(&payload)
        .map_err(|err| link_error("send failed", err))?;

    if args.wait {
        let datagram = match rx.recv_timeout(wait_timeout) {
            Ok(datagram) => datagram,
            Err(RecvTimeoutError::Timeout) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no reply within {}", args.wait_timeout),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CliError::new(INTERNAL, "receiver dropped before reply"))
            }
        };
        print_datagram(&datagram, link.transport_label(), format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data, --hex or --file is required"))
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .trim()
        .trim_start_matches("0x")
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "--hex needs an even number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("??");
            u8::from_str_radix(text, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte: {text}")))
        })
        .collect()
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
