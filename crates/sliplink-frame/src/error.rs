/// Errors that can occur while reading or writing framed streams.
///
/// Malformed inbound data is never reported here: the decoder drops or
/// passes through bad frames and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum frame size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
