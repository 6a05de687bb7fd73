

use thiserror::Error;

use super::node::NodeId;


#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Operation unavailable: {0}")]
    OperationUnavailable(String),

    #[error("Element {0} is locked")]
    Locked(NodeId),

    #[error("Missing permission on element {0}")]
    PermissionDenied(NodeId),

    #[error("Element {0} was already deleted")]
    ElementDeleted(NodeId),

    #[error("Element not found: {0}")]
    NotFound(NodeId),

    #[error("Server rejected operation: {0}")]
    Rejected(String),

    #[error("Record store error: {0}")]
    Record(String),
}

impl HostError {
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}


#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid removal target: {0}")]
    InvalidTarget(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}


pub type Result<T> = std::result::Result<T, PurgeError>;
