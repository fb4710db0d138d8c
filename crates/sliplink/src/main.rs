mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sliplink", version, about = "SLIP framing and point-to-point links")]
struct Cli {
    /// Output format for received datagrams.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "SLIPLINK_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "SLIPLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "sliplink",
            "send",
            "/tmp/test.sock",
            "--hex",
            "45c0",
            "--wait",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(ref args) if args.wait));
    }

    #[test]
    #[cfg(unix)]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "sliplink",
            "send",
            "/tmp/test.sock",
            "--hex",
            "c0",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn decode_frame_options_map_to_config() {
        let cli = Cli::try_parse_from([
            "sliplink",
            "decode",
            "--max-frame-size",
            "1006",
            "--strict",
        ])
        .expect("decode args should parse");

        let Command::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        let config = args.frame.config();
        assert_eq!(config.max_frame_size, Some(1006));
        assert_eq!(config.escape_policy, sliplink_frame::EscapePolicy::Reject);
    }

    #[test]
    #[cfg(unix)]
    fn serve_requires_config() {
        let err = Cli::try_parse_from(["sliplink", "serve"]).expect_err("missing config");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
