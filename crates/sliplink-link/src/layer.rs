use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use sliplink_frame::FrameConfig;
use sliplink_transport::Transport;
use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::link::{Link, LinkStats};
use crate::neighbor::NeighborAddr;

/// Consumer callback for datagrams arriving on any link.
pub type DatagramCallback = Box<dyn FnMut(Bytes) + Send + 'static>;

/// The single consumer slot shared by every link's dispatch closure.
#[derive(Default)]
struct Receiver {
    callback: Mutex<Option<DatagramCallback>>,
    unclaimed: AtomicU64,
}

impl Receiver {
    fn dispatch(&self, datagram: Bytes) {
        let mut callback = self.callback.lock();
        match callback.as_mut() {
            Some(callback) => callback(datagram),
            None => {
                self.unclaimed.fetch_add(1, Ordering::Relaxed);
                debug!(len = datagram.len(), "no receiver registered; dropping datagram");
            }
        }
    }
}

/// Point-to-point links keyed by neighbor address.
///
/// The neighbor set is fixed at construction, one [`Link`] per neighbor.
/// Every datagram any link reassembles goes to the one registered consumer,
/// in the order that link completes them. Datagrams that arrive before a
/// consumer is registered are dropped and counted; use
/// [`with_receiver`](Self::with_receiver) to rule that window out.
pub struct LinkLayer {
    links: HashMap<NeighborAddr, Link>,
    receiver: Arc<Receiver>,
}

impl LinkLayer {
    /// Build one link per `(neighbor, transport)` pair.
    pub fn new<I, A, T>(neighbors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, T)>,
        A: Into<NeighborAddr>,
        T: Transport + 'static,
    {
        Self::with_config(neighbors, FrameConfig::default())
    }

    /// Build the layer with the consumer already bound.
    pub fn with_receiver<I, A, T>(
        neighbors: I,
        callback: impl FnMut(Bytes) + Send + 'static,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (A, T)>,
        A: Into<NeighborAddr>,
        T: Transport + 'static,
    {
        Self::with_config_and_receiver(neighbors, FrameConfig::default(), callback)
    }

    /// Build the layer with explicit framing configuration for every link.
    pub fn with_config<I, A, T>(neighbors: I, config: FrameConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (A, T)>,
        A: Into<NeighborAddr>,
        T: Transport + 'static,
    {
        Self::build(neighbors, config, Arc::new(Receiver::default()))
    }

    /// Build the layer with explicit framing configuration and the consumer
    /// already bound.
    pub fn with_config_and_receiver<I, A, T>(
        neighbors: I,
        config: FrameConfig,
        callback: impl FnMut(Bytes) + Send + 'static,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (A, T)>,
        A: Into<NeighborAddr>,
        T: Transport + 'static,
    {
        let receiver = Arc::new(Receiver::default());
        *receiver.callback.lock() = Some(Box::new(callback));
        Self::build(neighbors, config, receiver)
    }

    fn build<I, A, T>(neighbors: I, config: FrameConfig, receiver: Arc<Receiver>) -> Result<Self>
    where
        I: IntoIterator<Item = (A, T)>,
        A: Into<NeighborAddr>,
        T: Transport + 'static,
    {
        let mut links = HashMap::new();
        for (addr, transport) in neighbors {
            let addr = addr.into();
            if links.contains_key(&addr) {
                return Err(LinkError::DuplicateNeighbor(addr));
            }

            let sink = Arc::clone(&receiver);
            let link = Link::with_receiver(transport, config.clone(), move |datagram| {
                sink.dispatch(datagram)
            })?;

            debug!(neighbor = %addr, transport = link.transport_label(), "link ready");
            links.insert(addr, link);
        }

        info!(neighbors = links.len(), "link layer started");
        Ok(Self { links, receiver })
    }

    /// Install the consumer for inbound datagrams. Replaces any previous one.
    ///
    /// The consumer runs with the layer's receiver lock held, so it must not
    /// call `register_receiver` itself, nor send on a link whose peer is in
    /// this same layer (a [`MemoryTransport`] loop delivers on the sending
    /// thread). Hand datagrams off to another thread for either.
    ///
    /// [`MemoryTransport`]: sliplink_transport::MemoryTransport
    pub fn register_receiver(&self, callback: impl FnMut(Bytes) + Send + 'static) {
        *self.receiver.callback.lock() = Some(Box::new(callback));
    }

    /// Send `datagram` to the directly-connected neighbor `next_hop`.
    ///
    /// Fails with [`LinkError::UnknownNeighbor`] before touching any
    /// transport if `next_hop` is not configured.
    pub fn send(&self, datagram: &[u8], next_hop: &str) -> Result<()> {
        let link = self
            .links
            .get(next_hop)
            .ok_or_else(|| LinkError::UnknownNeighbor(next_hop.into()))?;
        link.send(datagram)
    }

    /// The link serving `neighbor`, if configured.
    pub fn link(&self, neighbor: &str) -> Option<&Link> {
        self.links.get(neighbor)
    }

    /// Configured neighbors, sorted.
    pub fn neighbors(&self) -> Vec<&NeighborAddr> {
        let mut addrs: Vec<_> = self.links.keys().collect();
        addrs.sort();
        addrs
    }

    /// Counters for every link, sorted by neighbor.
    pub fn stats(&self) -> Vec<(NeighborAddr, LinkStats)> {
        let mut stats: Vec<_> = self
            .links
            .iter()
            .map(|(addr, link)| (addr.clone(), link.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    /// Datagrams dropped because no consumer was registered yet.
    pub fn unclaimed(&self) -> u64 {
        self.receiver.unclaimed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for LinkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkLayer")
            .field("neighbors", &self.neighbors())
            .finish()
    }
}
