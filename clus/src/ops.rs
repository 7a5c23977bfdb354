//! Cluster VM operations and failover handling

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cluster::{ClusterUtils, FailoverEvent, FailoverMonitor};
use crate::error::{ClusError, Result};
use crate::instance::{Instance, InstanceStore, PowerState, VmState};
use crate::instance_map::InstanceMap;
use crate::listener;
use crate::network::{ConsoleOps, MigrationSpec, NetworkApi, VifOps};
use crate::tracker::FailoverTracker;
use crate::utils::hosts_equal;

/// Failover handling configuration.
#[derive(Debug, Clone)]
pub struct ClusterOpsConfig {
    /// Pause between failover monitor polls.
    pub event_check_interval: Duration,
}

impl Default for ClusterOpsConfig {
    fn default() -> Self {
        Self {
            event_check_interval: Duration::from_secs(2),
        }
    }
}

/// External services cluster operations act through.
#[derive(Clone)]
pub struct Collaborators {
    pub cluster: Arc<dyn ClusterUtils>,
    pub monitor: Arc<dyn FailoverMonitor>,
    pub instances: Arc<dyn InstanceStore>,
    pub network: Arc<dyn NetworkApi>,
    pub vifs: Arc<dyn VifOps>,
    pub console: Arc<dyn ConsoleOps>,
}

/// How a failover event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// The VM is not managed by the orchestrator.
    Untracked,
    /// A user-requested migration is moving the VM.
    UserMigration,
    /// The VM is still on the node it was last seen on.
    HostUnchanged,
    /// The VM left this node; local bindings were released.
    SourceCleanup,
    /// The VM moved between two other nodes.
    NotForThisNode,
    /// The VM failed over to this node, which now owns it.
    TookOwnership,
}

/// Cluster operations for the VMs of one compute node.
pub struct ClusterOps {
    this_node: String,
    config: ClusterOpsConfig,
    cluster: Arc<dyn ClusterUtils>,
    monitor: Arc<dyn FailoverMonitor>,
    instances: Arc<dyn InstanceStore>,
    network: Arc<dyn NetworkApi>,
    vifs: Arc<dyn VifOps>,
    console: Arc<dyn ConsoleOps>,
    instance_map: InstanceMap,
    tracker: FailoverTracker,
    daemon: Mutex<Option<JoinHandle<()>>>,
}

impl ClusterOps {
    /// Resolve the local node name and warm the instance map.
    ///
    /// The failover listener is not started; see
    /// [`start_failover_listener`](Self::start_failover_listener).
    pub fn new(collaborators: Collaborators, config: ClusterOpsConfig) -> Result<Self> {
        let this_node = collaborators.cluster.get_node_name()?;
        let instance_map = InstanceMap::new(Arc::clone(&collaborators.instances));

        if let Err(e) = instance_map.rebuild() {
            error!(error = %e, "Failed to load instance map, will retry on lookup");
        }

        info!(node = %this_node, "Cluster operations initialized");

        Ok(Self {
            this_node,
            config,
            cluster: collaborators.cluster,
            monitor: collaborators.monitor,
            instances: collaborators.instances,
            network: collaborators.network,
            vifs: collaborators.vifs,
            console: collaborators.console,
            instance_map,
            tracker: FailoverTracker::new(),
            daemon: Mutex::new(None),
        })
    }

    /// Name of the node this process runs on.
    pub fn this_node(&self) -> &str {
        &self.this_node
    }

    pub fn instance_map(&self) -> &InstanceMap {
        &self.instance_map
    }

    pub fn tracker(&self) -> &FailoverTracker {
        &self.tracker
    }

    pub fn get_instance_host(&self, instance: &Instance) -> Result<String> {
        self.cluster.get_vm_host(&instance.name)
    }

    /// Make the instance highly available. Failures are logged, not returned.
    pub fn add_to_cluster(&self, instance: &Instance) {
        let result = self.cluster.add_vm_to_cluster(&instance.name).and_then(|()| {
            let host = self.cluster.get_vm_host(&instance.name)?;
            self.tracker.record(&instance.name, &host);
            self.instance_map.insert(&instance.name, instance.id);
            Ok(())
        });

        if let Err(e) = result {
            error!(instance = %instance.name, error = %e, "Adding instance to cluster failed");
        }
    }

    /// Drop the instance's cluster role. Failures are logged, not returned.
    pub fn remove_from_cluster(&self, instance: &Instance) {
        match self.cluster.delete(&instance.name) {
            Ok(()) => {
                self.tracker.clear(&instance.name);
                self.instance_map.remove(&instance.name);
            }
            Err(e) => error!(
                instance = %instance.name,
                error = %e,
                "Removing instance from cluster failed"
            ),
        }
    }

    /// Record an orchestrator-driven migration to this node, so the owner
    /// change it causes is not mistaken for a failover.
    pub fn post_migration(&self, instance: &Instance) {
        self.tracker.record(&instance.name, &self.this_node);
        self.instance_map.insert(&instance.name, instance.id);
    }

    /// Spawn the background failover listener on the current Tokio runtime.
    ///
    /// Calling this again while a listener exists does nothing.
    pub fn start_failover_listener(self: &Arc<Self>) -> Result<()> {
        let mut daemon = self.daemon.lock().unwrap_or_else(PoisonError::into_inner);
        if daemon.is_some() {
            debug!("Failover listener already running");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| ClusError::NoRuntime)?;
        let period = self.config.event_check_interval;
        *daemon = Some(runtime.spawn(listener::run(Arc::clone(self), period)));

        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.daemon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// One blocking wait on the failover monitor.
    ///
    /// Every delivered event is handled before the next one, and a failure
    /// or panic handling one event does not stop the rest.
    pub(crate) fn poll_failover_events(&self) -> Result<()> {
        self.monitor.monitor(&mut |event| self.handle_failover_event(event))
    }

    fn handle_failover_event(&self, event: FailoverEvent) {
        let handled = panic::catch_unwind(AssertUnwindSafe(|| {
            self.failover_migrate(&event.instance_name, &event.new_host)
        }));

        match handled {
            Ok(Ok(outcome)) => {
                debug!(instance = %event.instance_name, ?outcome, "Failover event handled")
            }
            Ok(Err(e)) => error!(
                instance = %event.instance_name,
                host = %event.new_host,
                error = %e,
                "Failover handling failed"
            ),
            Err(payload) => error!(
                instance = %event.instance_name,
                host = %event.new_host,
                panic = %panic_message(payload.as_ref()),
                "Failover handling panicked"
            ),
        }
    }

    /// Decide whether an owner change is a failover to this node and act on it.
    ///
    /// A VM that just left this node has its local bindings released. A VM
    /// that arrived here is taken over: orchestrator record, network ports,
    /// VIFs and console handler.
    pub fn failover_migrate(&self, instance_name: &str, new_host: &str) -> Result<FailoverOutcome> {
        info!(instance = %instance_name, host = %new_host, "Checking failover of instance");

        let old_host = self.tracker.get(instance_name);
        info!(instance = %instance_name, old_host = ?old_host, "Instance last known host");

        let Some(mut instance) = self.get_instance_by_name(instance_name)? else {
            debug!(instance = %instance_name, "Instance not in the orchestrator, skipping");
            return Ok(FailoverOutcome::Untracked);
        };

        if instance.task_state.is_some_and(|state| state.is_migrating()) {
            debug!(instance = %instance_name, "Instance is being migrated by request");
            return Ok(FailoverOutcome::UserMigration);
        }

        if let Some(old_host) = old_host.as_deref() {
            if hosts_equal(old_host, new_host) {
                debug!(instance = %instance_name, "Instance host did not change");
                return Ok(FailoverOutcome::HostUnchanged);
            }

            if hosts_equal(old_host, &self.this_node) {
                debug!(instance = %instance_name, "Releasing instance at source node");
                let network_info = self.network.get_instance_nw_info(&instance)?;
                self.vifs.unplug_vifs(&instance, &network_info)?;
                self.console.stop_console_handler(instance_name)?;
                self.tracker.record(instance_name, new_host);
                return Ok(FailoverOutcome::SourceCleanup);
            }
        }

        if !hosts_equal(new_host, &self.this_node) {
            debug!(instance = %instance_name, "Instance did not fail over to this node");
            self.tracker.record(instance_name, new_host);
            return Ok(FailoverOutcome::NotForThisNode);
        }

        info!(
            instance = %instance_name,
            host = %self.this_node,
            "Failing over instance to this node"
        );

        let network_info = self.network.get_instance_nw_info(&instance)?;
        self.failover_server(&mut instance)?;
        self.failover_migrate_networks(&instance, old_host.as_deref())?;
        self.vifs.post_start_vifs(&instance, &network_info)?;
        self.console.start_console_handler(instance_name)?;

        self.tracker.record(instance_name, &self.this_node);
        self.instance_map.insert(instance_name, instance.id);

        Ok(FailoverOutcome::TookOwnership)
    }

    fn get_instance_by_name(&self, instance_name: &str) -> Result<Option<Instance>> {
        match self.instance_map.lookup(instance_name)? {
            Some(id) => self.instances.get_by_id(id).map(Some),
            None => Ok(None),
        }
    }

    /// Point the orchestrator record at this node.
    ///
    /// A slow failover can leave the instance in error; it is running again
    /// once it reaches this point.
    fn failover_server(&self, instance: &mut Instance) -> Result<()> {
        if instance.vm_state == VmState::Error {
            instance.vm_state = VmState::Active;
        }
        if instance.power_state == PowerState::NoState {
            instance.power_state = PowerState::Running;
        }

        instance.host = Some(self.this_node.clone());
        instance.node = Some(self.this_node.clone());
        self.instances.save(instance, None)
    }

    /// Move the instance's ports from `source` to this node.
    fn failover_migrate_networks(&self, instance: &Instance, source: Option<&str>) -> Result<()> {
        let migration = MigrationSpec {
            source_compute: source.map(str::to_string),
            dest_compute: self.this_node.clone(),
        };

        self.network.setup_networks_on_host(instance, &self.this_node, false)?;
        self.network.migrate_instance_start(instance, &migration)?;
        self.network.setup_networks_on_host(instance, &self.this_node, false)?;
        self.network.migrate_instance_finish(instance, &migration)?;
        self.network.setup_networks_on_host(instance, &self.this_node, false)?;

        match source {
            Some(source) => self.network.setup_networks_on_host(instance, source, true),
            None => {
                debug!(instance = %instance.name, "No previous host, skipping network teardown");
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
