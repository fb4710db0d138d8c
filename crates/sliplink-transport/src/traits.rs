use std::sync::Arc;

use crate::error::Result;

/// Callback invoked with each raw inbound chunk.
///
/// Chunk boundaries are chosen by the transport and carry no meaning.
pub type ReceiveCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// A raw byte-stream endpoint with no framing of its own.
///
/// Implementations must deliver inbound chunks serially: the callback is
/// never invoked concurrently with itself for the same transport.
pub trait Transport: Send + Sync {
    /// Transmit raw bytes verbatim.
    fn send(&self, bytes: &[u8]) -> Result<()>;

    /// Install the receive callback. Called once, by the owning link.
    fn register_receiver(&self, callback: ReceiveCallback) -> Result<()>;

    /// Short human-readable label for diagnostics.
    fn label(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn register_receiver(&self, callback: ReceiveCallback) -> Result<()> {
        (**self).register_receiver(callback)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }

    fn register_receiver(&self, callback: ReceiveCallback) -> Result<()> {
        (**self).register_receiver(callback)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
