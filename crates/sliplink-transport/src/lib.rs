//! Byte-stream transports for SLIP links.
//!
//! A transport is the "physical layer" underneath a link: it moves raw,
//! unframed bytes and hands inbound chunks to a registered callback, with
//! no guarantee about where one chunk ends and the next begins.
//!
//! This is the lowest layer of sliplink. Everything else builds on top of
//! the [`Transport`] trait provided here:
//! - [`StreamTransport`] adapts any duplex `Read + Write` stream
//! - [`UnixDomainSocket`] binds/connects filesystem sockets (Unix)
//! - [`Pty`] opens a raw pseudo-terminal pair (Linux)
//! - [`MemoryTransport`] is an in-process connected pair for tests and demos

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod pty;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::{StreamTransport, READ_CHUNK_SIZE};
pub use traits::{ReceiveCallback, Transport};

#[cfg(target_os = "linux")]
pub use pty::Pty;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
