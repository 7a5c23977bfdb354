//! In-memory stand-ins for the cluster, orchestrator and network services

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clus::{
    ClusError, ClusterUtils, Collaborators, ConsoleOps, FailoverEvent, FailoverMonitor, Instance,
    InstanceFilter, InstanceId, InstanceStore, MigrationSpec, NetworkApi, NetworkInfo, PowerState,
    Result, TaskState, Vif, VifOps, VmState,
};

pub const LOCAL: &str = "LOCAL";

/// What one `monitor` call does.
pub enum MonitorStep {
    Deliver(Vec<FailoverEvent>),
    Fail(ClusError),
    Panic,
}

pub fn instance(id: InstanceId, name: &str) -> Instance {
    Instance {
        id,
        uuid: format!("uuid-{id}"),
        name: name.to_string(),
        vm_state: VmState::Active,
        power_state: PowerState::Running,
        task_state: None,
        host: Some("REMOTE".to_string()),
        node: Some("REMOTE".to_string()),
        config_drive: false,
    }
}

/// Implements every collaborator trait and records the calls made on it.
pub struct FakeEnv {
    node: String,
    pub vm_hosts: Mutex<HashMap<String, String>>,
    pub instances: Mutex<BTreeMap<InstanceId, Instance>>,
    pub saves: Mutex<Vec<(Instance, Option<TaskState>)>>,
    pub script: Mutex<VecDeque<MonitorStep>>,
    pub failing_networks: Mutex<HashSet<String>>,
    pub panicking_consoles: Mutex<HashSet<String>>,
    pub fail_cluster: AtomicBool,
    pub polls: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeEnv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            node: LOCAL.to_string(),
            vm_hosts: Mutex::new(HashMap::new()),
            instances: Mutex::new(BTreeMap::new()),
            saves: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            failing_networks: Mutex::new(HashSet::new()),
            panicking_consoles: Mutex::new(HashSet::new()),
            fail_cluster: AtomicBool::new(false),
            polls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            cluster: self.clone(),
            monitor: self.clone(),
            instances: self.clone(),
            network: self.clone(),
            vifs: self.clone(),
            console: self.clone(),
        }
    }

    pub fn add_instance(&self, instance: Instance) {
        self.instances.lock().unwrap().insert(instance.id, instance);
    }

    pub fn push_events(&self, events: Vec<FailoverEvent>) {
        self.script
            .lock()
            .unwrap()
            .push_back(MonitorStep::Deliver(events));
    }

    pub fn push_error(&self, error: ClusError) {
        self.script.lock().unwrap().push_back(MonitorStep::Fail(error));
    }

    pub fn push_panic(&self) {
        self.script.lock().unwrap().push_back(MonitorStep::Panic);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<(Instance, Option<TaskState>)> {
        self.saves.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn cluster_result(&self) -> Result<()> {
        if self.fail_cluster.load(Ordering::SeqCst) {
            return Err(ClusError::ClusterOperationFailed("cluster unavailable".into()));
        }
        Ok(())
    }
}

impl ClusterUtils for FakeEnv {
    fn add_vm_to_cluster(&self, vm_name: &str) -> Result<()> {
        self.record(format!("add_vm_to_cluster {vm_name}"));
        self.cluster_result()
    }

    fn delete(&self, vm_name: &str) -> Result<()> {
        self.record(format!("delete {vm_name}"));
        self.cluster_result()
    }

    fn get_vm_host(&self, vm_name: &str) -> Result<String> {
        self.record(format!("get_vm_host {vm_name}"));
        self.vm_hosts
            .lock()
            .unwrap()
            .get(vm_name)
            .cloned()
            .ok_or_else(|| ClusError::NotFound(vm_name.to_string()))
    }

    fn get_node_name(&self) -> Result<String> {
        Ok(self.node.clone())
    }
}

impl FailoverMonitor for FakeEnv {
    fn monitor(&self, callback: &mut dyn FnMut(FailoverEvent)) -> Result<()> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(MonitorStep::Deliver(events)) => {
                events.into_iter().for_each(|event| callback(event));
                Ok(())
            }
            Some(MonitorStep::Fail(e)) => Err(e),
            Some(MonitorStep::Panic) => panic!("failover watcher crashed"),
            None => {
                std::thread::sleep(Duration::from_millis(5));
                Ok(())
            }
        }
    }
}

impl InstanceStore for FakeEnv {
    fn list_instances(&self, _: &InstanceFilter) -> Result<Vec<Instance>> {
        Ok(self.instances.lock().unwrap().values().cloned().collect())
    }

    fn get_by_id(&self, id: InstanceId) -> Result<Instance> {
        self.instances
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ClusError::NotFound(id.to_string()))
    }

    fn save(&self, instance: &Instance, expected_task_state: Option<TaskState>) -> Result<()> {
        self.saves
            .lock()
            .unwrap()
            .push((instance.clone(), expected_task_state));
        self.instances
            .lock()
            .unwrap()
            .insert(instance.id, instance.clone());
        Ok(())
    }
}

impl NetworkApi for FakeEnv {
    fn get_instance_nw_info(&self, instance: &Instance) -> Result<NetworkInfo> {
        self.record(format!("get_instance_nw_info {}", instance.name));
        if self.failing_networks.lock().unwrap().contains(&instance.name) {
            return Err(ClusError::Network("port lookup failed".into()));
        }
        Ok(NetworkInfo {
            vifs: vec![Vif {
                id: format!("vif-{}", instance.id),
                address: Some("fa:16:3e:00:00:01".to_string()),
                vif_type: Some("hyperv".to_string()),
            }],
        })
    }

    fn setup_networks_on_host(
        &self,
        instance: &Instance,
        host: &str,
        teardown: bool,
    ) -> Result<()> {
        self.record(format!(
            "setup_networks_on_host {} {host} teardown={teardown}",
            instance.name
        ));
        Ok(())
    }

    fn migrate_instance_start(&self, instance: &Instance, migration: &MigrationSpec) -> Result<()> {
        self.record(format!(
            "migrate_instance_start {} {:?}->{}",
            instance.name, migration.source_compute, migration.dest_compute
        ));
        Ok(())
    }

    fn migrate_instance_finish(
        &self,
        instance: &Instance,
        migration: &MigrationSpec,
    ) -> Result<()> {
        self.record(format!(
            "migrate_instance_finish {} {:?}->{}",
            instance.name, migration.source_compute, migration.dest_compute
        ));
        Ok(())
    }
}

impl VifOps for FakeEnv {
    fn unplug_vifs(&self, instance: &Instance, network_info: &NetworkInfo) -> Result<()> {
        self.record(format!("unplug_vifs {} {}", instance.name, network_info.vifs.len()));
        Ok(())
    }

    fn post_start_vifs(&self, instance: &Instance, network_info: &NetworkInfo) -> Result<()> {
        self.record(format!("post_start_vifs {} {}", instance.name, network_info.vifs.len()));
        Ok(())
    }
}

impl ConsoleOps for FakeEnv {
    fn start_console_handler(&self, instance_name: &str) -> Result<()> {
        self.record(format!("start_console_handler {instance_name}"));
        let panics = self.panicking_consoles.lock().unwrap().contains(instance_name);
        if panics {
            panic!("console handler for {instance_name} crashed");
        }
        Ok(())
    }

    fn stop_console_handler(&self, instance_name: &str) -> Result<()> {
        self.record(format!("stop_console_handler {instance_name}"));
        Ok(())
    }
}
