//! Nullable node infrastructure for deterministic testing.
//!
//! The bridge only ever talks to a node through the `chainview-node-api`
//! traits. This crate provides in-memory implementations that:
//! - Return whatever state the test put in
//! - Can be switched to "unreachable" to exercise failure paths
//! - Record side effects (network toggles, subscriptions) for assertions
//!
//! Usage: hand an `Arc<NullNode>` and an `Arc<NullEventRegistry>` to the
//! bridge, mutate the node, then `fire` events or run a poll cycle.

pub mod events;
pub mod node;

pub use events::NullEventRegistry;
pub use node::{AlertLookupHook, NodeState, NullNode};
