use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{unescape, FrameConfig, END, ESC};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Running totals kept by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames handed out.
    pub frames: u64,
    /// Frames dropped for a malformed escape under `EscapePolicy::Reject`.
    pub malformed: u64,
    /// Frames dropped for exceeding `max_frame_size`.
    pub oversized: u64,
}

/// Reassembles SLIP frames from an arbitrarily chunked byte stream.
///
/// Bytes are appended to a single buffer. A cursor remembers how far the
/// buffer has already been searched for `END`, so each byte is scanned once
/// no matter how finely the stream is fragmented. Complete frames are split
/// off the front; whatever follows the last `END` is the residual, carried
/// into the next call. The residual never contains a complete frame once
/// [`next_frame`](Self::next_frame) has returned `None`.
///
/// Empty segments (back-to-back `END` bytes) carry no payload and are
/// skipped. The sequence of frames produced is the same however the input
/// was chunked.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    scanned: usize,
    discarding: bool,
    config: FrameConfig,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            discarding: false,
            config,
            stats: DecoderStats::default(),
        }
    }

    /// Append a chunk from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete, non-empty frame, unescaped.
    ///
    /// Returns `None` once no complete frame remains; the unterminated tail
    /// stays buffered.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            let Some(offset) = memchr::memchr(END, &self.buf[self.scanned..]) else {
                self.scanned = self.buf.len();
                self.limit_residual();
                return None;
            };

            let end = self.scanned + offset;
            let mut body = self.buf.split_to(end + 1);
            body.truncate(end);
            self.scanned = 0;

            if self.discarding {
                // Closing delimiter of a frame already dropped as oversized.
                self.discarding = false;
                continue;
            }
            if body.is_empty() {
                continue;
            }
            if let Some(max) = self.config.max_frame_size {
                if body.len() > max {
                    self.stats.oversized += 1;
                    warn!(size = body.len(), max, "dropping oversized frame");
                    continue;
                }
            }

            let size = body.len();
            let payload = if memchr::memchr(ESC, &body).is_none() {
                Some(body.freeze())
            } else {
                unescape(&body, self.config.escape_policy)
            };

            match payload {
                Some(payload) => {
                    self.stats.frames += 1;
                    return Some(payload);
                }
                None => {
                    self.stats.malformed += 1;
                    warn!(size, "dropping frame with malformed escape");
                }
            }
        }
    }

    /// Feed one chunk and collect every frame it completes, in order.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.push(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Bytes held over from previous chunks (still-escaped, no `END`).
    pub fn residual(&self) -> &[u8] {
        &self.buf
    }

    /// Forget the residual and any in-progress discard.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
        self.discarding = false;
    }

    /// Running totals since construction.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn limit_residual(&mut self) {
        let Some(max) = self.config.max_frame_size else {
            return;
        };
        if self.buf.len() <= max {
            return;
        }
        if !self.discarding {
            self.stats.oversized += 1;
            warn!(buffered = self.buf.len(), max, "frame exceeds limit; discarding until next END");
            self.discarding = true;
        } else {
            debug!(buffered = self.buf.len(), "still discarding oversized frame");
        }
        self.buf.clear();
        self.scanned = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
