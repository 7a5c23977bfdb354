//! VM name to orchestrator instance id cache

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::Result;
use crate::instance::{InstanceFilter, InstanceId, InstanceStore};

/// Maps hypervisor VM names to orchestrator instance ids.
///
/// Entries are only added or explicitly removed; a lookup miss triggers one
/// rebuild from the instance store.
pub struct InstanceMap {
    store: Arc<dyn InstanceStore>,
    ids: Mutex<HashMap<String, InstanceId>>,
}

impl InstanceMap {
    pub fn new(store: Arc<dyn InstanceStore>) -> Self {
        Self {
            store,
            ids: Mutex::new(HashMap::new()),
        }
    }

    fn ids(&self) -> MutexGuard<'_, HashMap<String, InstanceId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached id, without touching the store.
    pub fn get(&self, name: &str) -> Option<InstanceId> {
        self.ids().get(name).copied()
    }

    pub fn insert(&self, name: &str, id: InstanceId) {
        self.ids().insert(name.to_string(), id);
    }

    pub fn remove(&self, name: &str) -> Option<InstanceId> {
        self.ids().remove(name)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Reload every non-deleted instance from the store.
    ///
    /// Returns the number of instances listed.
    pub fn rebuild(&self) -> Result<usize> {
        let instances = self.store.list_instances(&InstanceFilter { deleted: false })?;
        let listed = instances.len();

        let mut ids = self.ids();
        for instance in instances {
            ids.insert(instance.name, instance.id);
        }
        debug!(listed, cached = ids.len(), "Rebuilt instance map");

        Ok(listed)
    }

    /// Cached id, rebuilding once on a miss.
    pub fn lookup(&self, name: &str) -> Result<Option<InstanceId>> {
        if let Some(id) = self.get(name) {
            return Ok(Some(id));
        }
        self.rebuild()?;
        Ok(self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusError;
    use crate::instance::{Instance, PowerState, TaskState, VmState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ListingStore {
        instances: Vec<Instance>,
        lists: AtomicUsize,
    }

    impl InstanceStore for ListingStore {
        fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
            assert!(!filter.deleted);
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(self.instances.clone())
        }

        fn get_by_id(&self, id: InstanceId) -> Result<Instance> {
            Err(ClusError::NotFound(id.to_string()))
        }

        fn save(&self, _: &Instance, _: Option<TaskState>) -> Result<()> {
            Ok(())
        }
    }

    fn instance(id: InstanceId, name: &str) -> Instance {
        Instance {
            id,
            uuid: format!("uuid-{id}"),
            name: name.to_string(),
            vm_state: VmState::Active,
            power_state: PowerState::Running,
            task_state: None,
            host: None,
            node: None,
            config_drive: false,
        }
    }

    fn store(instances: Vec<Instance>) -> Arc<ListingStore> {
        Arc::new(ListingStore {
            instances,
            lists: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_lookup_hit_does_not_query_store() {
        let store = store(vec![]);
        let map = InstanceMap::new(store.clone());
        map.insert("instance-1", 1);

        assert_eq!(map.lookup("instance-1").unwrap(), Some(1));
        assert_eq!(store.lists.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lookup_miss_rebuilds_once() {
        let store = store(vec![instance(7, "instance-7"), instance(8, "instance-8")]);
        let map = InstanceMap::new(store.clone());

        assert_eq!(map.lookup("instance-8").unwrap(), Some(8));
        assert_eq!(store.lists.load(Ordering::SeqCst), 1);

        assert_eq!(map.lookup("unmanaged-vm").unwrap(), None);
        assert_eq!(store.lists.load(Ordering::SeqCst), 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_remove() {
        let map = InstanceMap::new(store(vec![]));
        map.insert("instance-1", 1);
        assert_eq!(map.remove("instance-1"), Some(1));
        assert!(map.is_empty());
    }
}
