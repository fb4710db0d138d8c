use std::io::{ErrorKind, Read, Write};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{ReceiveCallback, Transport};

/// Maximum number of bytes handed to the receive callback per read.
pub const READ_CHUNK_SIZE: usize = 4 * 1024;

type BoxedReader = Box<dyn Read + Send>;
type BoxedWriter = Box<dyn Write + Send>;
type ShutdownHook = Box<dyn Fn() + Send + Sync>;

/// Adapts a duplex byte stream into a [`Transport`].
///
/// Writes go straight to the writer half under a lock. Reads happen on a
/// dedicated thread, spawned when the receiver is registered, which hands
/// every chunk it reads to the callback in arrival order.
///
/// Dropping the transport stops the reader thread when the stream can be
/// shut down (Unix sockets) and waits for it to exit. For other streams
/// (files, PTYs) the thread runs until the stream reports EOF or an error.
pub struct StreamTransport {
    label: String,
    writer: Mutex<BoxedWriter>,
    reader: Mutex<Option<BoxedReader>>,
    shutdown: Option<ShutdownHook>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamTransport {
    /// Build a transport from separate read and write halves.
    pub fn new<R, W>(label: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            label: label.into(),
            writer: Mutex::new(Box::new(writer)),
            reader: Mutex::new(Some(Box::new(reader))),
            shutdown: None,
            worker: Mutex::new(None),
        }
    }

    /// Install a hook that unblocks the reader thread; run on drop.
    pub fn with_shutdown(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.shutdown = Some(Box::new(hook));
        self
    }

    /// Build a transport over a connected Unix stream.
    #[cfg(unix)]
    pub fn from_unix_stream(
        label: impl Into<String>,
        stream: std::os::unix::net::UnixStream,
    ) -> Result<Self> {
        let reader = stream.try_clone()?;
        let control = stream.try_clone()?;
        Ok(Self::new(label, reader, stream).with_shutdown(move || {
            let _ = control.shutdown(std::net::Shutdown::Read);
        }))
    }

    /// Build a transport over an open file handle (e.g. a tty device).
    pub fn from_file(label: impl Into<String>, file: std::fs::File) -> Result<Self> {
        let reader = file.try_clone()?;
        Ok(Self::new(label, reader, file))
    }
}

impl Transport for StreamTransport {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();

        let mut offset = 0usize;
        while offset < bytes.len() {
            match writer.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match writer.flush() {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        trace!(transport = %self.label, len = bytes.len(), "sent bytes");
        Ok(())
    }

    fn register_receiver(&self, callback: ReceiveCallback) -> Result<()> {
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| TransportError::ReceiverRegistered(self.label.clone()))?;

        let label = self.label.clone();
        let handle = std::thread::Builder::new()
            .name(format!("sliplink-rx-{label}"))
            .spawn(move || read_loop(label, reader, callback))?;
        *self.worker.lock() = Some(handle);

        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        let Some(shutdown) = self.shutdown.as_ref() else {
            return;
        };
        shutdown();

        let Some(handle) = self.worker.get_mut().take() else {
            return;
        };
        // Dropped from inside the receive callback: the thread exits on its own.
        if handle.thread().id() == std::thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!(transport = %self.label, "reader thread panicked");
        }
    }
}

fn read_loop(label: String, mut reader: BoxedReader, mut callback: ReceiveCallback) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(transport = %label, error = %err, "read failed; stopping receiver");
                return;
            }
        };

        if read == 0 {
            debug!(transport = %label, "stream closed");
            return;
        }

        trace!(transport = %label, len = read, "received chunk");
        callback(&chunk[..read]);
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_writes_bytes_verbatim() {
        let sink = SharedSink::default();
        let transport = StreamTransport::new("sink", Cursor::new(Vec::new()), sink.clone());

        transport.send(&[0xC0, 0x01, 0xC0]).unwrap();
        transport.send(b"more").unwrap();

        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            &[0xC0, 0x01, 0xC0, b'm', b'o', b'r', b'e']
        );
    }

    #[test]
    fn receiver_gets_all_bytes_then_stops_at_eof() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3 * READ_CHUNK_SIZE + 17).collect();
        let transport = StreamTransport::new("cursor", Cursor::new(data.clone()), std::io::sink());

        let (tx, rx) = mpsc::channel();
        transport
            .register_receiver(Box::new(move |chunk| {
                tx.send(chunk.to_vec()).unwrap();
            }))
            .unwrap();

        let mut received = Vec::new();
        while let Ok(chunk) = rx.recv_timeout(Duration::from_secs(2)) {
            assert!(chunk.len() <= READ_CHUNK_SIZE);
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, data);
    }

    #[test]
    fn second_registration_is_rejected() {
        let transport = StreamTransport::new("once", Cursor::new(Vec::new()), std::io::sink());
        transport.register_receiver(Box::new(|_| {})).unwrap();

        let err = transport.register_receiver(Box::new(|_| {})).unwrap_err();
        assert!(matches!(err, TransportError::ReceiverRegistered(label) if label == "once"));
    }

    #[test]
    fn zero_length_write_reports_shutdown() {
        struct ClosedWriter;
        impl Write for ClosedWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let transport = StreamTransport::new("closed", Cursor::new(Vec::new()), ClosedWriter);
        let err = transport.send(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));
    }

    #[test]
    #[cfg(unix)]
    fn unix_stream_pair_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let left = StreamTransport::from_unix_stream("left", left).unwrap();
        let right = StreamTransport::from_unix_stream("right", right).unwrap();

        let (tx, rx) = mpsc::channel();
        right
            .register_receiver(Box::new(move |chunk| {
                tx.send(chunk.to_vec()).unwrap();
            }))
            .unwrap();

        left.send(b"ping").unwrap();

        let mut received = Vec::new();
        while received.len() < 4 {
            received.extend(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        assert_eq!(received, b"ping");
    }

    #[test]
    #[cfg(unix)]
    fn drop_stops_reader_thread_while_peer_stays_open() {
        let (local, _peer) = std::os::unix::net::UnixStream::pair().unwrap();
        let transport = StreamTransport::from_unix_stream("local", local).unwrap();

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        transport
            .register_receiver(Box::new(move |chunk| {
                let _ = tx.send(chunk.to_vec());
            }))
            .unwrap();

        drop(transport);

        // The callback (and its sender) is gone once the thread has exited.
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }
}
