//! Clustered Hyper-V compute driver
//!
//! Ties together:
//! - Block device placement (`hyperv-storage`)
//! - Failover cluster tracking and failover handling (`clus`)
//! - TOML configuration and tracing setup

pub mod config;
pub mod driver;
pub mod error;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{Config, ConfigError};
pub use driver::{ComputeDriver, HyperVClusterDriver};
pub use error::{BoxError, DriverError, Result};

// =============================================================================
// Tracing Initialization
// =============================================================================

/// Initialize tracing/logging with the given filter level
pub fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
