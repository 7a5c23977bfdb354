//! Error types for cluster operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusError {
    #[error("Cluster operation failed: {0}")]
    ClusterOperationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to save instance {name}: {reason}")]
    InstanceSaveFailed { name: String, reason: String },

    #[error("Network operation failed: {0}")]
    Network(String),

    #[error("Console operation failed: {0}")]
    Console(String),

    #[error("Failover listener must be started from within a Tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, ClusError>;
