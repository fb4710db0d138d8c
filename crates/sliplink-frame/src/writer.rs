use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, encoded_len, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Writes complete SLIP frames to any blocking `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame `payload` and write it out, then flush.
    ///
    /// With a `max_frame_size` configured, payloads whose escaped body would
    /// be refused by a peer using the same limit are rejected up front.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if let Some(max) = self.config.max_frame_size {
            let size = encoded_len(payload) - 2;
            if size > max {
                return Err(FrameError::FrameTooLarge { size, max });
            }
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::decoder::FrameDecoder;

    #[test]
    fn writes_exact_wire_bytes() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&[b'a', 0xC0, 0xDB]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![0xC0, b'a', 0xDB, 0xDC, 0xDB, 0xDD, 0xC0]);
    }

    #[test]
    fn consecutive_frames_decode_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(b"one").unwrap();
        writer.send(b"two").unwrap();

        let wire = writer.into_inner().into_inner();
        let frames = FrameDecoder::new().decode(&wire);
        assert_eq!(frames, vec![&b"one"[..], b"two"]);
    }

    #[test]
    fn frame_too_large_rejected() {
        let cfg = FrameConfig {
            max_frame_size: Some(4),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        // Three bytes, but five once escaped.
        let err = writer.send(&[0xC0, 0xC0, b'x']).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 5, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());

        writer.send(b"four").unwrap();
    }

    #[test]
    fn zero_write_means_closed() {
        struct ClosedWriter;
        impl Write for ClosedWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = FrameWriter::new(ClosedWriter);
        assert!(matches!(
            writer.send(b"x").unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn interrupted_write_retries() {
        struct Flaky {
            interrupted: bool,
            out: Vec<u8>,
        }
        impl Write for Flaky {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                // Short writes exercise the offset loop.
                self.out.push(buf[0]);
                Ok(1)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = FrameWriter::new(Flaky {
            interrupted: false,
            out: Vec::new(),
        });
        writer.send(b"ok").unwrap();
        assert_eq!(writer.into_inner().out, b"\xC0ok\xC0");
    }
}
