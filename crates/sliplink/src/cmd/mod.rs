use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::{Args, Subcommand};
use sliplink_frame::{EscapePolicy, FrameConfig};

use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod listen;
#[cfg(target_os = "linux")]
pub mod pty;
#[cfg(unix)]
pub mod send;
#[cfg(unix)]
pub mod serve;
pub mod version;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one datagram from stdin and write its SLIP frame to stdout.
    Encode(EncodeArgs),
    /// Read a SLIP byte stream from stdin and print each datagram.
    Decode(DecodeArgs),
    /// Bind a Unix socket, accept one peer and print its datagrams.
    #[cfg(unix)]
    Listen(ListenArgs),
    /// Connect to a Unix socket and send one datagram.
    #[cfg(unix)]
    Send(SendArgs),
    /// Run a link layer from a neighbor config file.
    #[cfg(unix)]
    Serve(ServeArgs),
    /// Open a pseudo-terminal and print datagrams framed onto it.
    #[cfg(target_os = "linux")]
    Pty(PtyArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Listen(args) => listen::run(args, format),
        #[cfg(unix)]
        Command::Send(args) => send::run(args, format),
        #[cfg(unix)]
        Command::Serve(args) => serve::run(args, format),
        #[cfg(target_os = "linux")]
        Command::Pty(args) => pty::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Framing options shared by every command that decodes.
#[derive(Args, Debug, Clone, Default)]
pub struct FrameArgs {
    /// Drop frames whose escaped body exceeds this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_frame_size: Option<usize>,
    /// Drop frames containing malformed escape sequences instead of passing them through.
    #[arg(long)]
    pub strict: bool,
}

impl FrameArgs {
    pub fn config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_size: self.max_frame_size,
            escape_policy: if self.strict {
                EscapePolicy::Reject
            } else {
                EscapePolicy::PassThrough
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Write the frame as lowercase hex instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Exit after printing N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Exit after receiving N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
    /// Send every received datagram back to the peer.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload, e.g. `45c0db`.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Wait for one datagram back and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Neighbor config file (JSON).
    #[arg(long, short = 'c', env = "SLIPLINK_CONFIG")]
    pub config: PathBuf,
    /// Exit after receiving N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
}

#[cfg(target_os = "linux")]
#[derive(Args, Debug)]
pub struct PtyArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Exit after receiving N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
    /// Send every received datagram back over the PTY.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Drain datagrams handed over by link callbacks until Ctrl-C, `count`
/// datagrams, or every sender is gone.
pub fn pump(
    inbox: mpsc::Receiver<Bytes>,
    count: Option<usize>,
    mut on_datagram: impl FnMut(Bytes) -> CliResult<()>,
) -> CliResult<i32> {
    if count == Some(0) {
        return Ok(SUCCESS);
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut handled = 0usize;
    while running.load(Ordering::SeqCst) {
        let datagram = match inbox.recv_timeout(POLL_INTERVAL) {
            Ok(datagram) => datagram,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        on_datagram(datagram)?;
        handled = handled.saturating_add(1);

        if count.is_some_and(|count| handled >= count) {
            break;
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
