//! Error types for the cluster driver

use thiserror::Error;

use clus::ClusError;
use hyperv_storage::BlockDeviceError;

/// Error reported by a base compute driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Block device placement failed: {0}")]
    Placement(#[from] BlockDeviceError),

    #[error("Cluster operation failed: {0}")]
    Cluster(#[from] ClusError),

    #[error("Compute driver failed to {operation} instance {instance}: {source}")]
    Compute {
        operation: &'static str,
        instance: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, DriverError>;
