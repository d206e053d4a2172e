use chainview_node_api::NodeApiError;
use thiserror::Error;

/// Construction-time failures. Nothing after construction returns this:
/// transient node failures are absorbed into sentinel values.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("no tokio runtime available to drive the poll timer")]
    NoRuntime,

    #[error("failed to subscribe to node events: {0}")]
    Subscribe(#[from] NodeApiError),
}
