//! SLIP links and the neighbor-keyed link layer.
//!
//! A [`Link`] owns one transport endpoint and turns it into a datagram pipe.
//! A [`LinkLayer`] holds one link per directly-connected neighbor, sends each
//! datagram down the link for its next hop, and fans every inbound datagram
//! up to a single consumer.

pub mod config;
pub mod error;
pub mod layer;
pub mod link;
pub mod neighbor;

pub use config::{Endpoint, LinkLayerConfig};
pub use error::{LinkError, Result};
pub use layer::{DatagramCallback, LinkLayer};
pub use link::{FrameCallback, Link, LinkStats};
pub use neighbor::NeighborAddr;
