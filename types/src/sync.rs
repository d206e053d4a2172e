//! Origin of the blocks the node is currently processing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the blocks currently being connected come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncSource {
    /// Not importing anything.
    #[default]
    None,
    /// Rebuilding the block index from the local block files.
    Reindex,
    /// Importing blocks from disk (bootstrap file or `-loadblock`).
    Disk,
    /// Downloading blocks from peers.
    Network,
}

impl SyncSource {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Reindex => "reindex",
            Self::Disk => "disk",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_short_name() {
        assert_eq!(SyncSource::Network.to_string(), "network");
        assert_eq!(SyncSource::default().to_string(), "none");
    }
}
