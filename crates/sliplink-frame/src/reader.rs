use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::codec::FrameConfig;
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete SLIP frames from any blocking `Read` stream.
///
/// Handles partial reads internally; callers always get whole datagrams.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    failed: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_config(config),
            failed: false,
        }
    }

    /// Read the next datagram (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF; an unterminated
    /// trailing frame is never returned.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.decoder.push(&chunk[..read]);
        }
    }

    /// Decoder state, including running statistics.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Bytes>;

    /// Yields frames until the stream closes. The first I/O error is
    /// yielded once and ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
