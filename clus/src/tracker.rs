//! Last known owner node of each clustered VM

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tracks which node each clustered VM was last seen on, so an owner-change
/// event can be told apart from a repeat of the current placement.
#[derive(Debug, Default)]
pub struct FailoverTracker {
    hosts: Mutex<HashMap<String, String>>,
}

impl FailoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn hosts(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, vm_name: &str) -> Option<String> {
        self.hosts().get(vm_name).cloned()
    }

    pub fn record(&self, vm_name: &str, host: &str) {
        self.hosts().insert(vm_name.to_string(), host.to_string());
    }

    pub fn clear(&self, vm_name: &str) {
        self.hosts().remove(vm_name);
    }
}
