//! Free controller slot accounting for one placement session.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BlockDeviceError, Result};
use crate::storage::ControllerType;

/// Remaining free slots per bus for a VM being built.
///
/// Created per validation call and dropped with it; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSlotPool {
    free: BTreeMap<ControllerType, u32>,
}

impl ControllerSlotPool {
    /// Fresh pool. A required config drive permanently takes one IDE slot.
    pub fn new(config_drive: bool) -> Self {
        let mut free = BTreeMap::new();
        free.insert(ControllerType::Ide, ControllerType::Ide.capacity());
        free.insert(ControllerType::Scsi, ControllerType::Scsi.capacity());

        if config_drive {
            if let Some(ide) = free.get_mut(&ControllerType::Ide) {
                *ide -= 1;
            }
        }

        Self { free }
    }

    /// Free slots left on `bus`.
    pub fn available(&self, bus: ControllerType) -> u32 {
        self.free.get(&bus).copied().unwrap_or(0)
    }

    /// Take one slot on `bus`, failing without side effects if none is left.
    pub fn allocate(&mut self, bus: ControllerType) -> Result<()> {
        match self.free.get_mut(&bus) {
            Some(slots) if *slots >= 1 => {
                *slots -= 1;
                debug!(%bus, remaining = *slots, "Allocated controller slot");
                Ok(())
            }
            _ => Err(BlockDeviceError::NoFreeSlots(bus)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity() {
        let pool = ControllerSlotPool::new(false);
        assert_eq!(pool.available(ControllerType::Ide), 4);
        assert_eq!(pool.available(ControllerType::Scsi), 64);
    }

    #[test]
    fn test_config_drive_reserves_ide_slot() {
        let mut pool = ControllerSlotPool::new(true);
        assert_eq!(pool.available(ControllerType::Ide), 3);

        pool.allocate(ControllerType::Ide).unwrap();
        assert_eq!(pool.available(ControllerType::Ide), 2);
    }

    #[test]
    fn test_allocate_checks_before_decrementing() {
        let mut pool = ControllerSlotPool::new(true);
        for _ in 0..3 {
            pool.allocate(ControllerType::Ide).unwrap();
        }

        assert_eq!(
            pool.allocate(ControllerType::Ide),
            Err(BlockDeviceError::NoFreeSlots(ControllerType::Ide))
        );
        assert_eq!(pool.available(ControllerType::Ide), 0);
        assert_eq!(pool.available(ControllerType::Scsi), 64);
    }
}
