use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use sliplink_frame::FrameConfig;

use crate::error::{LinkError, Result};
use crate::neighbor::NeighborAddr;

/// Where the byte stream for one neighbor comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Bind a Unix socket at this path and wait for the peer to connect.
    Listen(PathBuf),
    /// Connect to a Unix socket the peer is listening on.
    Connect(PathBuf),
    /// Open a character device (a serial line or PTY slave) read-write.
    Device(PathBuf),
}

/// Neighbor table and framing options for a [`LinkLayer`](crate::LinkLayer).
///
/// ```json
/// {
///   "neighbors": {
///     "10.0.0.2": { "connect": "/run/slip/router.sock" },
///     "10.0.0.3": { "device": "/dev/pts/7" }
///   },
///   "frame": { "max_frame_size": 1006 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkLayerConfig {
    pub neighbors: BTreeMap<NeighborAddr, Endpoint>,
    #[serde(default)]
    pub frame: FrameConfig,
}

impl LinkLayerConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LinkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        raw.parse()
    }

    fn validate(&self) -> Result<()> {
        if self.neighbors.is_empty() {
            return Err(LinkError::Config("no neighbors configured".to_string()));
        }
        if self.neighbors.keys().any(|addr| addr.as_str().is_empty()) {
            return Err(LinkError::Config("empty neighbor address".to_string()));
        }
        if self.frame.max_frame_size == Some(0) {
            return Err(LinkError::Config(
                "frame.max_frame_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromStr for LinkLayerConfig {
    type Err = LinkError;

    fn from_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(unix)]
mod open {
    use std::fs::OpenOptions;

    use bytes::Bytes;
    use sliplink_transport::{StreamTransport, UnixDomainSocket};
    use tracing::info;

    use super::{Endpoint, LinkLayerConfig};
    use crate::error::Result;
    use crate::layer::LinkLayer;
    use crate::neighbor::NeighborAddr;

    impl Endpoint {
        /// Open the endpoint as a byte-stream transport.
        ///
        /// `Listen` blocks until the peer connects; the socket file is
        /// removed once the connection is accepted.
        pub fn open(&self, label: &str) -> Result<StreamTransport> {
            let transport = match self {
                Endpoint::Listen(path) => {
                    let listener = UnixDomainSocket::bind(path)?;
                    info!(neighbor = label, path = %path.display(), "waiting for peer");
                    listener.accept()?
                }
                Endpoint::Connect(path) => UnixDomainSocket::connect(path)?,
                Endpoint::Device(path) => {
                    let file = OpenOptions::new()
                        .read(true)
                        .write(true)
                        .open(path)
                        .map_err(sliplink_transport::TransportError::from)?;
                    StreamTransport::from_file(label, file)?
                }
            };
            Ok(transport)
        }
    }

    impl LinkLayerConfig {
        /// Open every endpoint in address order and build the link layer.
        ///
        /// Datagrams arriving before a consumer is registered are dropped;
        /// prefer [`open_with_receiver`](Self::open_with_receiver).
        pub fn open(&self) -> Result<LinkLayer> {
            LinkLayer::with_config(self.open_endpoints()?, self.frame.clone())
        }

        /// Open every endpoint and build the layer with `callback` bound.
        ///
        /// No link reads from its endpoint until the consumer is in place,
        /// so nothing a peer sends while other endpoints are still being
        /// opened is lost.
        pub fn open_with_receiver(
            &self,
            callback: impl FnMut(Bytes) + Send + 'static,
        ) -> Result<LinkLayer> {
            LinkLayer::with_config_and_receiver(self.open_endpoints()?, self.frame.clone(), callback)
        }

        fn open_endpoints(&self) -> Result<Vec<(NeighborAddr, StreamTransport)>> {
            let mut neighbors = Vec::with_capacity(self.neighbors.len());
            for (addr, endpoint) in &self.neighbors {
                neighbors.push((addr.clone(), endpoint.open(addr.as_str())?));
            }
            Ok(neighbors)
        }
    }
}
