use std::path::PathBuf;

use crate::neighbor::NeighborAddr;

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No link is configured for the requested next hop.
    #[error("unknown neighbor: {0}")]
    UnknownNeighbor(NeighborAddr),

    /// The same neighbor address was given twice at construction.
    #[error("duplicate neighbor: {0}")]
    DuplicateNeighbor(NeighborAddr),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sliplink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] sliplink_frame::FrameError),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration is syntactically or semantically invalid.
    #[error("invalid config: {0}")]
    Config(String),

    /// JSON deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
