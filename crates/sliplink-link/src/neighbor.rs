use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;

/// Address of a directly-connected peer, e.g. `"10.0.0.2"`.
///
/// Opaque to this layer: it is only ever compared, hashed and printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct NeighborAddr(String);

impl NeighborAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NeighborAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NeighborAddr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NeighborAddr {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

impl From<String> for NeighborAddr {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}
