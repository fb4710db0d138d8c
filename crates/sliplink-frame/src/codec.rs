use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Follows `ESC` to stand for a literal `END`.
pub const ESC_END: u8 = 0xDC;
/// Follows `ESC` to stand for a literal `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// What the decoder does with an `ESC` not followed by `ESC_END`/`ESC_ESC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapePolicy {
    /// Keep the stray bytes as they are and deliver the frame.
    #[default]
    PassThrough,
    /// Drop the whole frame.
    Reject,
}

/// Decoder/encoder limits and policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Largest escaped frame body accepted, in bytes. `None` means unbounded.
    pub max_frame_size: Option<usize>,
    /// Handling of malformed escape sequences.
    pub escape_policy: EscapePolicy,
}

/// Wire length of `payload` once framed.
pub fn encoded_len(payload: &[u8]) -> usize {
    let specials = payload.iter().filter(|&&b| b == END || b == ESC).count();
    payload.len() + specials + 2
}

/// Append the SLIP frame for `payload` to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────────┬──────┐
/// │ 0xC0 │ payload, 0xDB -> DB DD, 0xC0 -> DB DC│ 0xC0 │
/// └──────┴──────────────────────────────────────┴──────┘
/// ```
///
/// Escaping each byte exactly once gives the same output as first rewriting
/// every `ESC` and then every `END`, without re-escaping introduced bytes.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(encoded_len(payload));
    dst.put_u8(END);

    let mut rest = payload;
    while let Some(pos) = memchr::memchr2(END, ESC, rest) {
        dst.put_slice(&rest[..pos]);
        match rest[pos] {
            END => dst.put_slice(&[ESC, ESC_END]),
            _ => dst.put_slice(&[ESC, ESC_ESC]),
        }
        rest = &rest[pos + 1..];
    }
    dst.put_slice(rest);

    dst.put_u8(END);
}

/// Frame `payload` into a fresh buffer.
pub fn encode(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::new();
    encode_frame(payload, &mut dst);
    dst.freeze()
}

/// Reverse the escaping of one frame body (delimiters already stripped).
///
/// Returns `None` only under [`EscapePolicy::Reject`] when the body holds an
/// escape that no encoder could have produced.
pub fn unescape(body: &[u8], policy: EscapePolicy) -> Option<Bytes> {
    let mut out = BytesMut::with_capacity(body.len());
    let mut rest = body;

    while let Some(pos) = memchr::memchr(ESC, rest) {
        out.put_slice(&rest[..pos]);
        match rest.get(pos + 1) {
            Some(&ESC_END) => {
                out.put_u8(END);
                rest = &rest[pos + 2..];
            }
            Some(&ESC_ESC) => {
                out.put_u8(ESC);
                rest = &rest[pos + 2..];
            }
            // Dangling or unknown escape: the next byte is processed normally.
            _ => {
                if policy == EscapePolicy::Reject {
                    return None;
                }
                out.put_u8(ESC);
                rest = &rest[pos + 1..];
            }
        }
    }
    out.put_slice(rest);

    Some(out.freeze())
}
