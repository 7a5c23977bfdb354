//! Error types for block device placement

use thiserror::Error;

use crate::storage::ControllerType;
use crate::vm::Generation;

/// Placement failures. Every variant is fatal to the VM build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockDeviceError {
    #[error("Hyper-V does not support disk type {device_type} for {role}s")]
    UnsupportedDeviceType {
        device_type: String,
        role: DeviceRole,
    },

    #[error("Hyper-V does not support bus type {bus} for {generation} instances")]
    UnsupportedBus { bus: String, generation: Generation },

    #[error("There are no more free slots on controller {0}")]
    NoFreeSlots(ControllerType),

    #[error("Unsupported root disk format: {}", .0.as_deref().unwrap_or("<none>"))]
    UnsupportedDiskFormat(Option<String>),

    #[error("Requested VM generation {0} is not supported on this host")]
    UnsupportedGeneration(String),

    #[error("Requested VM {0}, but provided VHD instead of VHDX")]
    IncompatibleVhdFormat(Generation),
}

/// Which device list a rejected request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Ephemeral,
    Volume,
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRole::Ephemeral => write!(f, "ephemeral"),
            DeviceRole::Volume => write!(f, "volume"),
        }
    }
}

pub type Result<T> = std::result::Result<T, BlockDeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = BlockDeviceError::UnsupportedBus {
            bus: "virtio".to_string(),
            generation: Generation::Gen2,
        };
        assert_eq!(
            err.to_string(),
            "Hyper-V does not support bus type virtio for Generation 2 instances"
        );

        let err = BlockDeviceError::NoFreeSlots(ControllerType::Ide);
        assert_eq!(
            err.to_string(),
            "There are no more free slots on controller IDE"
        );

        let err = BlockDeviceError::UnsupportedDeviceType {
            device_type: "cdrom".to_string(),
            role: DeviceRole::Ephemeral,
        };
        assert_eq!(
            err.to_string(),
            "Hyper-V does not support disk type cdrom for ephemerals"
        );
    }

    #[test]
    fn test_unsupported_disk_format_without_format() {
        let err = BlockDeviceError::UnsupportedDiskFormat(None);
        assert_eq!(err.to_string(), "Unsupported root disk format: <none>");
    }
}
