use thiserror::Error;

use crate::org::node::NodeKey;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from reading payload or config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid payload path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Malformed JSON in the organization listing.
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// The payload used a node kind the engine does not recognize.
    #[error("Unknown node kind: {0:?}")]
    UnknownKind(String),

    /// A node in the listing would become its own ancestor.
    #[error("Cycle detected in organization listing at {0}")]
    Cycle(NodeKey),

    /// The same (kind, id) pair appeared more than once in the listing.
    #[error("Duplicate node in organization listing: {0}")]
    DuplicateNode(NodeKey),
}
