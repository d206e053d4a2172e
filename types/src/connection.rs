//! Peer connection direction filter.

use serde::{Deserialize, Serialize};

/// Which peer connections to count.
///
/// Behaves like a two-bit set: `All` is `Inbound | Outbound`. It is only
/// ever used as a query filter, never stored as node state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionDirection {
    /// Matches no connection.
    None,
    /// Connections the remote peer opened.
    Inbound,
    /// Connections this node opened.
    Outbound,
    /// Both directions.
    #[default]
    All,
}

impl ConnectionDirection {
    const INBOUND_BIT: u8 = 1 << 0;
    const OUTBOUND_BIT: u8 = 1 << 1;

    /// Bit representation (`None = 0`, `Inbound = 1`, `Outbound = 2`, `All = 3`).
    pub fn bits(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Inbound => Self::INBOUND_BIT,
            Self::Outbound => Self::OUTBOUND_BIT,
            Self::All => Self::INBOUND_BIT | Self::OUTBOUND_BIT,
        }
    }

    /// Build a filter from its bit representation. Unknown high bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        let inbound = bits & Self::INBOUND_BIT != 0;
        let outbound = bits & Self::OUTBOUND_BIT != 0;
        match (inbound, outbound) {
            (false, false) => Self::None,
            (true, false) => Self::Inbound,
            (false, true) => Self::Outbound,
            (true, true) => Self::All,
        }
    }

    pub fn includes_inbound(&self) -> bool {
        self.bits() & Self::INBOUND_BIT != 0
    }

    pub fn includes_outbound(&self) -> bool {
        self.bits() & Self::OUTBOUND_BIT != 0
    }
}

impl std::ops::BitOr for ConnectionDirection {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from_bits(self.bits() | rhs.bits())
    }
}
