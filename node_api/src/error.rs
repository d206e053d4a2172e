use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeApiError {
    #[error("node is unreachable")]
    Unreachable,

    #[error("node is shutting down")]
    ShuttingDown,

    #[error("node backend error: {0}")]
    Backend(String),
}
