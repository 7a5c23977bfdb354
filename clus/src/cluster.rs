//! Failover cluster contracts

use crate::error::Result;

/// A VM changed owner node in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverEvent {
    pub instance_name: String,
    pub new_host: String,
}

impl FailoverEvent {
    pub fn new(instance_name: impl Into<String>, new_host: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            new_host: new_host.into(),
        }
    }
}

/// Cluster membership and placement of clustered VMs.
///
/// Implementations report cluster-layer failures as
/// [`ClusError::ClusterOperationFailed`](crate::ClusError::ClusterOperationFailed).
pub trait ClusterUtils: Send + Sync {
    /// Make the VM a highly available cluster role.
    fn add_vm_to_cluster(&self, vm_name: &str) -> Result<()>;

    /// Remove the VM's cluster role.
    fn delete(&self, vm_name: &str) -> Result<()>;

    /// Node currently owning the VM.
    fn get_vm_host(&self, vm_name: &str) -> Result<String>;

    /// Name of the node this process runs on.
    fn get_node_name(&self) -> Result<String>;
}

/// Source of VM owner-change notifications.
pub trait FailoverMonitor: Send + Sync {
    /// Wait once for failover notifications and pass each to `callback`.
    ///
    /// Blocks for at most one bounded wait, then returns so the caller can
    /// poll again.
    fn monitor(&self, callback: &mut dyn FnMut(FailoverEvent)) -> Result<()>;
}
