use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{encode_frame, encoded_len, FrameConfig};
use crate::decoder::FrameDecoder;
use crate::error::FrameError;

/// `tokio_util` codec for SLIP streams.
///
/// Decoding drains the framed buffer into an internal [`FrameDecoder`], so
/// the residual and escape handling match the blocking API exactly.
#[derive(Debug, Default)]
pub struct SlipCodec {
    decoder: FrameDecoder,
}

impl SlipCodec {
    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(config),
        }
    }

    /// Decoder state, including running statistics.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl Decoder for SlipCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let chunk = src.split();
            self.decoder.push(&chunk);
        }
        Ok(self.decoder.next_frame())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.decode(src)?;
        if frame.is_none() && !self.decoder.residual().is_empty() {
            debug!(
                residual = self.decoder.residual().len(),
                "stream ended inside a frame"
            );
            self.decoder.clear();
        }
        Ok(frame)
    }
}

impl<'a> Encoder<&'a [u8]> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        if let Some(max) = self.decoder.config().max_frame_size {
            let size = encoded_len(item) - 2;
            if size > max {
                return Err(FrameError::FrameTooLarge { size, max });
            }
        }
        encode_frame(item, dst);
        Ok(())
    }
}

impl Encoder<Bytes> for SlipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&[u8]>::encode(self, item.as_ref(), dst)
    }
}
