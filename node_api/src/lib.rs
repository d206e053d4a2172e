//! Abstract node traits for the chainview bridge.
//!
//! Every node implementation (an embedded full node, an RPC-backed remote
//! node, an in-memory nullable for tests) implements these traits. The
//! bridge depends only on the traits.

pub mod error;
pub mod facade;
pub mod registry;

pub use error::NodeApiError;
pub use facade::NodeFacade;
pub use registry::{EventHandler, NodeEventRegistry, SubscriptionHandle};
