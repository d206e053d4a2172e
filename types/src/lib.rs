//! Value types shared across the chainview workspace.
//!
//! This crate defines the small vocabulary every other crate speaks:
//! connection filters, sync sources, alert statuses, node events and
//! timestamps.

pub mod alert;
pub mod connection;
pub mod event;
pub mod sync;
pub mod time;

pub use alert::AlertStatus;
pub use connection::ConnectionDirection;
pub use event::{MessageStyle, NodeEvent};
pub use sync::SyncSource;
pub use time::Timestamp;
