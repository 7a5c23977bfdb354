//! Hyper-V failover cluster support for a compute node
//!
//! Keeps clustered VMs registered with the failover cluster and reacts when
//! the cluster moves a VM between nodes: the node a VM failed over to takes
//! ownership of it in the orchestrator and the network service, and the node
//! it left releases its local bindings.
//!
//! Every external service is reached through a trait ([`ClusterUtils`],
//! [`FailoverMonitor`], [`InstanceStore`], [`NetworkApi`], [`VifOps`],
//! [`ConsoleOps`]) bundled into [`Collaborators`].

mod cluster;
mod error;
mod instance;
mod instance_map;
mod listener;
mod network;
mod ops;
mod tracker;
mod utils;

pub use cluster::{ClusterUtils, FailoverEvent, FailoverMonitor};
pub use error::{ClusError, Result};
pub use instance::{
    Instance, InstanceFilter, InstanceId, InstanceStore, PowerState, TaskState, VmState,
};
pub use instance_map::InstanceMap;
pub use network::{ConsoleOps, MigrationSpec, NetworkApi, NetworkInfo, Vif, VifOps};
pub use ops::{ClusterOps, ClusterOpsConfig, Collaborators, FailoverOutcome};
pub use tracker::FailoverTracker;
pub use utils::{hosts_equal, normalize_host};
