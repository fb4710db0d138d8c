//! SLIP (RFC 1055) framing over raw byte streams, and a link layer that
//! carries datagrams to directly-connected neighbors.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream endpoints (Unix sockets, PTYs, in-memory pairs)
//! - [`frame`]: SLIP encoding and the residual-carrying stream decoder
//! - [`link`]: one [`Link`](link::Link) per endpoint, and the
//!   [`LinkLayer`](link::LinkLayer) that routes datagrams by next hop
//!
//! ```
//! use sliplink::link::LinkLayer;
//! use sliplink::transport::MemoryTransport;
//!
//! let (host_end, router_end) = MemoryTransport::pair("host", "router");
//! let host = LinkLayer::new([("10.0.0.1", host_end)])?;
//! let router = LinkLayer::new([("10.0.0.2", router_end)])?;
//! router.register_receiver(|datagram| assert_eq!(datagram.as_ref(), b"ping"));
//!
//! host.send(b"ping", "10.0.0.1")?;
//! assert!(host.send(b"ping", "10.9.9.9").is_err());
//! # Ok::<(), sliplink::link::LinkError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use sliplink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sliplink_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use sliplink_link::*;
}
