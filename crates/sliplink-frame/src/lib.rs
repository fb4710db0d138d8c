//! SLIP byte-stuffed framing with stream reassembly.
//!
//! Every datagram travels on the wire as:
//! - an END byte (`0xC0`)
//! - the payload, with `0xDB` escaped as `DB DD` and `0xC0` as `DB DC`
//! - a closing END byte
//!
//! [`FrameDecoder`] turns an arbitrarily chunked byte stream back into the
//! exact datagram sequence, carrying any unterminated tail between calls.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    encode, encode_frame, encoded_len, unescape, EscapePolicy, FrameConfig, END, ESC, ESC_END,
    ESC_ESC,
};
pub use decoder::{DecoderStats, FrameDecoder};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::SlipCodec;
