//! Alert lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle transition reported for a network alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    /// The alert was seen for the first time.
    New,
    /// The alert text or priority changed.
    Updated,
    /// The alert expired or was cancelled.
    Expired,
}

impl AlertStatus {
    /// Whether the alert is still in force after this transition.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_expired_is_inactive() {
        assert!(AlertStatus::New.is_active());
        assert!(AlertStatus::Updated.is_active());
        assert!(!AlertStatus::Expired.is_active());
    }
}
