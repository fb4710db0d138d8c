//! In-process transport pair.
//!
//! Bytes sent on one end are delivered synchronously, on the sending thread,
//! to the receive callback of the other end. Bytes that arrive before a
//! callback is registered are held and flushed on registration, the way a
//! kernel buffer would hold them. Every send is also recorded for inspection.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{ReceiveCallback, Transport};

struct Endpoint {
    label: String,
    callback: Mutex<Option<ReceiveCallback>>,
    pending: Mutex<Vec<u8>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl Endpoint {
    fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            callback: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn deliver(&self, bytes: &[u8]) {
        let mut callback = self.callback.lock();
        match callback.as_mut() {
            Some(callback) => callback(bytes),
            None => self.pending.lock().extend_from_slice(bytes),
        }
    }
}

/// One end of an in-memory byte pipe.
#[derive(Clone)]
pub struct MemoryTransport {
    local: Arc<Endpoint>,
    remote: Option<Arc<Endpoint>>,
}

impl MemoryTransport {
    /// A standalone endpoint: sends are only recorded, inbound bytes come from [`inject`].
    ///
    /// [`inject`]: MemoryTransport::inject
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            local: Endpoint::new(label),
            remote: None,
        }
    }

    /// Two connected endpoints.
    pub fn pair(left: impl Into<String>, right: impl Into<String>) -> (Self, Self) {
        let left = Endpoint::new(left);
        let right = Endpoint::new(right);
        (
            Self {
                local: Arc::clone(&left),
                remote: Some(Arc::clone(&right)),
            },
            Self {
                local: right,
                remote: Some(left),
            },
        )
    }

    /// Deliver `bytes` to this endpoint's own receive callback, as if they
    /// had arrived from the wire.
    pub fn inject(&self, bytes: &[u8]) {
        self.local.deliver(bytes);
    }

    /// Everything sent from this endpoint, one entry per `send` call.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.local.sent.lock().clone()
    }

    /// Everything sent from this endpoint, concatenated.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.local.sent.lock().concat()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, bytes: &[u8]) -> Result<()> {
        self.local.sent.lock().push(bytes.to_vec());
        trace!(transport = %self.local.label, len = bytes.len(), "sent bytes");
        if let Some(remote) = &self.remote {
            remote.deliver(bytes);
        }
        Ok(())
    }

    fn register_receiver(&self, mut callback: ReceiveCallback) -> Result<()> {
        let mut slot = self.local.callback.lock();
        if slot.is_some() {
            return Err(TransportError::ReceiverRegistered(self.local.label.clone()));
        }

        let pending = std::mem::take(&mut *self.local.pending.lock());
        if !pending.is_empty() {
            callback(&pending);
        }
        *slot = Some(callback);
        Ok(())
    }

    fn label(&self) -> &str {
        &self.local.label
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("label", &self.local.label)
            .field("connected", &self.remote.is_some())
            .finish()
    }
}
