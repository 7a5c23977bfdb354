//! Orchestrator-side instance records

use crate::error::Result;

/// Orchestrator database id of an instance.
pub type InstanceId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmState {
    Active,
    Building,
    Stopped,
    Paused,
    Suspended,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    NoState,
    Running,
    Paused,
    Shutdown,
    Crashed,
    Suspended,
}

/// In-flight operation on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Spawning,
    Rebooting,
    Migrating,
    ResizeMigrating,
    Deleting,
}

impl TaskState {
    /// A user-requested live or cold migration is moving the VM.
    pub fn is_migrating(&self) -> bool {
        matches!(self, TaskState::Migrating | TaskState::ResizeMigrating)
    }
}

/// An instance as recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: InstanceId,
    pub uuid: String,
    /// Hypervisor-level VM name.
    pub name: String,
    pub vm_state: VmState,
    pub power_state: PowerState,
    pub task_state: Option<TaskState>,
    pub host: Option<String>,
    pub node: Option<String>,
    pub config_drive: bool,
}

/// Filter for listing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceFilter {
    pub deleted: bool,
}

/// Orchestrator instance persistence.
pub trait InstanceStore: Send + Sync {
    fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<Instance>>;

    fn get_by_id(&self, id: InstanceId) -> Result<Instance>;

    /// Persist `instance`, but only if the stored task state still equals
    /// `expected_task_state`.
    fn save(&self, instance: &Instance, expected_task_state: Option<TaskState>) -> Result<()>;
}
