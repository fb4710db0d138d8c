use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use sliplink_frame::{encode, FrameConfig, FrameDecoder, FrameError};
use sliplink_transport::Transport;
use tracing::{debug, trace};

use crate::error::Result;

/// Callback invoked with each reassembled datagram.
pub type FrameCallback = Box<dyn FnMut(Bytes) + Send + 'static>;

/// Point-in-time counters for one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_sent: u64,
    /// Wire bytes, delimiters and escapes included.
    pub bytes_sent: u64,
    pub frames_received: u64,
    /// Datagrams decoded while no frame callback was registered.
    pub frames_dropped: u64,
    pub malformed: u64,
    pub oversized: u64,
    /// Bytes currently held waiting for a closing `END`.
    pub residual_len: usize,
}

struct Inbound {
    decoder: Mutex<FrameDecoder>,
    callback: Mutex<Option<FrameCallback>>,
    dropped: AtomicU64,
}

impl Inbound {
    fn on_bytes(&self, chunk: &[u8]) {
        let frames = self.decoder.lock().decode(chunk);
        trace!(len = chunk.len(), frames = frames.len(), "decoded chunk");
        if frames.is_empty() {
            return;
        }

        let mut callback = self.callback.lock();
        match callback.as_mut() {
            Some(callback) => frames.into_iter().for_each(|frame| callback(frame)),
            None => {
                self.dropped
                    .fetch_add(frames.len() as u64, Ordering::Relaxed);
                debug!(count = frames.len(), "no frame callback; dropping datagrams");
            }
        }
    }
}

/// One SLIP link over a single transport endpoint.
///
/// Outbound datagrams are framed and written straight through. Inbound
/// chunks are reassembled into datagrams, carrying any partial frame across
/// calls, and handed to the frame callback in wire order. The transport must
/// deliver chunks serially; frames are collected under the decoder lock and
/// delivered after it is released, while the callback lock is held.
pub struct Link {
    transport: Box<dyn Transport>,
    inbound: Arc<Inbound>,
    max_frame_size: Option<usize>,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl Link {
    /// Attach a link to `transport` with default framing configuration.
    pub fn new(transport: impl Transport + 'static) -> Result<Self> {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Attach a link to `transport`, installing itself as the transport's receiver.
    ///
    /// Datagrams completed before [`register_receiver`](Self::register_receiver)
    /// is called are dropped; use [`with_receiver`](Self::with_receiver) when
    /// the peer may already be sending.
    pub fn with_config(transport: impl Transport + 'static, config: FrameConfig) -> Result<Self> {
        Self::attach(transport, config, None)
    }

    /// Attach a link with its frame callback bound before the transport
    /// starts delivering bytes.
    pub fn with_receiver(
        transport: impl Transport + 'static,
        config: FrameConfig,
        callback: impl FnMut(Bytes) + Send + 'static,
    ) -> Result<Self> {
        Self::attach(transport, config, Some(Box::new(callback)))
    }

    fn attach(
        transport: impl Transport + 'static,
        config: FrameConfig,
        callback: Option<FrameCallback>,
    ) -> Result<Self> {
        let max_frame_size = config.max_frame_size;
        let inbound = Arc::new(Inbound {
            decoder: Mutex::new(FrameDecoder::with_config(config)),
            callback: Mutex::new(callback),
            dropped: AtomicU64::new(0),
        });

        let sink = Arc::clone(&inbound);
        transport.register_receiver(Box::new(move |chunk| sink.on_bytes(chunk)))?;
        debug!(transport = transport.label(), "link attached");

        Ok(Self {
            transport: Box::new(transport),
            inbound,
            max_frame_size,
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        })
    }

    /// Install the callback for reassembled datagrams. Replaces any previous one.
    ///
    /// Must not be called from inside the callback itself.
    pub fn register_receiver(&self, callback: impl FnMut(Bytes) + Send + 'static) {
        *self.inbound.callback.lock() = Some(Box::new(callback));
    }

    /// Frame `datagram` and hand it to the transport.
    pub fn send(&self, datagram: &[u8]) -> Result<()> {
        let frame = encode(datagram);
        if let Some(max) = self.max_frame_size {
            let size = frame.len() - 2;
            if size > max {
                return Err(FrameError::FrameTooLarge { size, max }.into());
            }
        }

        self.transport.send(&frame)?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(frame.len() as u64, Ordering::Relaxed);
        trace!(transport = self.transport.label(), len = datagram.len(), "sent datagram");
        Ok(())
    }

    /// Feed raw bytes as if they had come from the transport.
    pub fn on_bytes(&self, chunk: &[u8]) {
        self.inbound.on_bytes(chunk);
    }

    /// Label of the underlying transport.
    pub fn transport_label(&self) -> &str {
        self.transport.label()
    }

    /// Snapshot of this link's counters.
    pub fn stats(&self) -> LinkStats {
        let decoder = self.inbound.decoder.lock();
        let decoded = decoder.stats();
        LinkStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_received: decoded.frames,
            frames_dropped: self.inbound.dropped.load(Ordering::Relaxed),
            malformed: decoded.malformed,
            oversized: decoded.oversized,
            residual_len: decoder.residual().len(),
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("transport", &self.transport.label())
            .finish()
    }
}
