//! Network, VIF and console contracts used after a failover

use crate::error::Result;
use crate::instance::Instance;

/// One virtual interface of an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vif {
    pub id: String,
    pub address: Option<String>,
    pub vif_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub vifs: Vec<Vif>,
}

/// Hosts involved when moving an instance's ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSpec {
    /// Unknown when the VM was never tracked before failing over.
    pub source_compute: Option<String>,
    pub dest_compute: String,
}

/// Network service operations on an instance's ports.
pub trait NetworkApi: Send + Sync {
    fn get_instance_nw_info(&self, instance: &Instance) -> Result<NetworkInfo>;

    /// Bind the instance's networking on `host`, or tear it down.
    fn setup_networks_on_host(&self, instance: &Instance, host: &str, teardown: bool) -> Result<()>;

    fn migrate_instance_start(&self, instance: &Instance, migration: &MigrationSpec) -> Result<()>;

    fn migrate_instance_finish(&self, instance: &Instance, migration: &MigrationSpec)
        -> Result<()>;
}

/// Local virtual switch port bindings.
pub trait VifOps: Send + Sync {
    fn unplug_vifs(&self, instance: &Instance, network_info: &NetworkInfo) -> Result<()>;

    /// Re-plug VIFs of a VM that is already running on this node.
    fn post_start_vifs(&self, instance: &Instance, network_info: &NetworkInfo) -> Result<()>;
}

/// Serial console log handlers.
pub trait ConsoleOps: Send + Sync {
    fn start_console_handler(&self, instance_name: &str) -> Result<()>;

    fn stop_console_handler(&self, instance_name: &str) -> Result<()>;
}
