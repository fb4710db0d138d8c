use sliplink_frame::{FrameError, FrameReader};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_datagram, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let stdin = std::io::stdin().lock();
    let mut reader = FrameReader::with_config(stdin, args.frame.config());

    let mut printed = 0usize;
    while args.count.is_none_or(|count| printed < count) {
        let datagram = match reader.read_frame() {
            Ok(datagram) => datagram,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        };

        print_datagram(&datagram, "stdin", format);
        printed = printed.saturating_add(1);
    }

    let decoder = reader.decoder();
    if !decoder.residual().is_empty() {
        warn!(
            residual = decoder.residual().len(),
            "input ended inside an unterminated frame"
        );
    }
    let stats = decoder.stats();
    debug!(
        frames = stats.frames,
        malformed = stats.malformed,
        oversized = stats.oversized,
        "decode finished"
    );

    Ok(SUCCESS)
}
