//! Block device placement: bus/slot assignment and boot order.
//!
//! The orchestrator hands over ephemeral disks, volume mappings and an
//! optional root device name. [`BlockDeviceInfoManager::validate_and_update`]
//! checks every device against the VM generation, assigns it a bus with a
//! free slot and returns a [`BlockDeviceLayout`]. The layout owns the slot
//! pool, so the root disk is resolved from it afterwards and competes for the
//! same controllers.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BlockDeviceError, DeviceRole, Result};
use crate::image::ImageMeta;
use crate::storage::{ControllerSlotPool, ControllerType};
use crate::vm::Generation;

/// Root mount device assumed when none is declared.
pub const DEFAULT_ROOT_DEVICE: &str = "/dev/sda";

const DISK_DEVICE_TYPE: &str = "disk";

/// One ephemeral disk or volume mapping as requested by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceSpec {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub disk_bus: Option<String>,
    #[serde(default)]
    pub boot_index: Option<u32>,
    #[serde(default)]
    pub mount_device: Option<String>,
    /// Opaque volume driver data, only present on volume mappings.
    #[serde(default)]
    pub connection_info: Option<Value>,
}

/// All block devices requested for an instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockDeviceInfo {
    #[serde(default)]
    pub root_device_name: Option<String>,
    #[serde(default)]
    pub ephemerals: Vec<DeviceSpec>,
    #[serde(default)]
    pub block_device_mapping: Vec<DeviceSpec>,
}

/// The instance fields placement cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: String,
    /// The user asked for a config drive.
    pub config_drive: bool,
}

/// Device types Hyper-V can attach for ephemerals and volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Disk,
}

/// A validated device with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDevice {
    pub device_type: DeviceType,
    pub disk_bus: ControllerType,
    pub boot_index: Option<u32>,
    pub mount_device: Option<String>,
    pub connection_info: Option<Value>,
}

/// What the VM boots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootDiskType {
    Volume,
    Disk,
    Dvd,
}

impl RootDiskType {
    /// Map an image disk format; `None` for formats Hyper-V cannot boot.
    pub fn from_disk_format(disk_format: &str) -> Option<Self> {
        match disk_format {
            "vhd" => Some(RootDiskType::Disk),
            "iso" => Some(RootDiskType::Dvd),
            _ => None,
        }
    }
}

/// The resolved root device. Always first in boot order.
#[derive(Debug, Clone, PartialEq)]
pub struct RootDisk {
    pub kind: RootDiskType,
    /// Filled in later, once the root image has been copied into place.
    pub path: Option<PathBuf>,
    pub connection_info: Option<Value>,
    pub disk_bus: ControllerType,
    pub boot_index: u32,
    pub mount_device: String,
}

/// Result of a successful validation, carrying the session's slot pool.
#[derive(Debug, Clone)]
pub struct BlockDeviceLayout {
    generation: Generation,
    slots: ControllerSlotPool,
    ephemerals: Vec<BlockDevice>,
    volumes: Vec<BlockDevice>,
    root_device_name: String,
    disk_format: Option<String>,
    root: Option<RootDisk>,
}

impl BlockDeviceLayout {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Ephemerals in boot order.
    pub fn ephemerals(&self) -> &[BlockDevice] {
        &self.ephemerals
    }

    /// Volumes in boot order.
    pub fn volumes(&self) -> &[BlockDevice] {
        &self.volumes
    }

    pub fn slots(&self) -> &ControllerSlotPool {
        &self.slots
    }

    pub fn root_device_name(&self) -> &str {
        &self.root_device_name
    }

    /// True when a volume mapping is mounted at the root device.
    pub fn is_boot_from_volume(&self) -> bool {
        self.root_volume().is_some()
    }

    fn root_volume(&self) -> Option<&BlockDevice> {
        let root = strip_dev(&self.root_device_name);
        self.volumes
            .iter()
            .find(|vol| vol.mount_device.as_deref().map(strip_dev) == Some(root))
    }

    /// Resolve the root disk, taking its slot from this layout's pool.
    ///
    /// Resolving twice returns the first result without allocating again.
    pub fn get_root_device(&mut self) -> Result<RootDisk> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }

        let (kind, connection_info) = match self.root_volume() {
            Some(volume) => (RootDiskType::Volume, volume.connection_info.clone()),
            None => {
                let kind = self
                    .disk_format
                    .as_deref()
                    .and_then(RootDiskType::from_disk_format)
                    .ok_or_else(|| {
                        BlockDeviceError::UnsupportedDiskFormat(self.disk_format.clone())
                    })?;
                (kind, None)
            }
        };

        let disk_bus = self.generation.root_controller();
        self.slots.allocate(disk_bus)?;

        let root = RootDisk {
            kind,
            path: None,
            connection_info,
            disk_bus,
            boot_index: 0,
            mount_device: self.root_device_name.clone(),
        };
        debug!(
            kind = ?root.kind,
            bus = %disk_bus,
            mount_device = %root.mount_device,
            "Resolved root device"
        );

        self.root = Some(root.clone());
        Ok(root)
    }
}

/// Validates block device requests against Hyper-V controller limits.
#[derive(Debug, Clone, Default)]
pub struct BlockDeviceInfoManager {
    force_config_drive: bool,
}

impl BlockDeviceInfoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a config drive to every instance, asked for or not.
    pub fn with_force_config_drive(mut self, force: bool) -> Self {
        self.force_config_drive = force;
        self
    }

    pub fn config_drive_required(&self, instance: &InstanceSpec) -> bool {
        self.force_config_drive || instance.config_drive
    }

    /// Validate every ephemeral and volume and assign each a bus.
    ///
    /// Ephemerals are checked first, then volumes, all against one shared
    /// slot pool. The first invalid device aborts the whole call; the
    /// caller's `block_device_info` is never modified.
    pub fn validate_and_update(
        &self,
        instance: &InstanceSpec,
        image_meta: &ImageMeta,
        generation: Generation,
        block_device_info: &BlockDeviceInfo,
    ) -> Result<BlockDeviceLayout> {
        let config_drive = self.config_drive_required(instance);
        let mut slots = ControllerSlotPool::new(config_drive);

        let mut ephemerals = check_devices(
            &block_device_info.ephemerals,
            DeviceRole::Ephemeral,
            generation,
            &mut slots,
        )?;
        let mut volumes = check_devices(
            &block_device_info.block_device_mapping,
            DeviceRole::Volume,
            generation,
            &mut slots,
        )?;

        sort_by_boot_order(&mut ephemerals);
        sort_by_boot_order(&mut volumes);

        debug!(
            instance = %instance.name,
            %generation,
            config_drive,
            ephemerals = ephemerals.len(),
            volumes = volumes.len(),
            "Validated block devices"
        );

        let root_device_name = block_device_info
            .root_device_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_DEVICE.to_string());

        Ok(BlockDeviceLayout {
            generation,
            slots,
            ephemerals,
            volumes,
            root_device_name,
            disk_format: image_meta.disk_format.clone(),
            root: None,
        })
    }
}

fn check_devices(
    specs: &[DeviceSpec],
    role: DeviceRole,
    generation: Generation,
    slots: &mut ControllerSlotPool,
) -> Result<Vec<BlockDevice>> {
    specs
        .iter()
        .map(|spec| check_device(spec, role, generation, slots))
        .collect()
}

fn check_device(
    spec: &DeviceSpec,
    role: DeviceRole,
    generation: Generation,
    slots: &mut ControllerSlotPool,
) -> Result<BlockDevice> {
    let device_type = match non_empty(&spec.device_type) {
        None | Some(DISK_DEVICE_TYPE) => DeviceType::Disk,
        Some(other) => {
            return Err(BlockDeviceError::UnsupportedDeviceType {
                device_type: other.to_string(),
                role,
            })
        }
    };

    let disk_bus = match non_empty(&spec.disk_bus) {
        None => generation.default_bus(),
        Some(raw) => raw
            .parse::<ControllerType>()
            .ok()
            .filter(|bus| generation.supports_bus(*bus))
            .ok_or_else(|| BlockDeviceError::UnsupportedBus {
                bus: raw.to_string(),
                generation,
            })?,
    };

    slots.allocate(disk_bus)?;

    Ok(BlockDevice {
        device_type,
        disk_bus,
        boot_index: spec.boot_index,
        mount_device: spec.mount_device.clone(),
        connection_info: spec.connection_info.clone(),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Devices with a boot index first, ascending; the rest keep their order.
fn sort_by_boot_order(devices: &mut [BlockDevice]) {
    devices.sort_by_key(|device| (device.boot_index.is_none(), device.boot_index));
}

fn strip_dev(device_name: &str) -> &str {
    device_name.strip_prefix("/dev/").unwrap_or(device_name)
}
