use core::fmt;

use tracing::debug;

use crate::error::{BlockDeviceError, Result};
use crate::image::{ImageMeta, VhdFormat, IMAGE_PROP_VM_GEN};
use crate::storage::ControllerType;

/// VM generation (Gen1 = BIOS, Gen2 = UEFI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Generation {
    /// Generation 1 VM (BIOS-based, IDE boot).
    #[default]
    Gen1,
    /// Generation 2 VM (UEFI-based, SCSI only).
    Gen2,
}

impl Generation {
    /// Image property value selecting this generation.
    pub fn image_property(&self) -> &'static str {
        match self {
            Generation::Gen1 => "hyperv-gen1",
            Generation::Gen2 => "hyperv-gen2",
        }
    }

    /// Parse from the `hw_machine_type` image property.
    pub fn from_image_property(value: &str) -> Option<Self> {
        match value {
            "hyperv-gen1" => Some(Generation::Gen1),
            "hyperv-gen2" => Some(Generation::Gen2),
            _ => None,
        }
    }

    /// Buses a block device may be attached to.
    pub fn valid_buses(&self) -> &'static [ControllerType] {
        match self {
            Generation::Gen1 => &[ControllerType::Ide, ControllerType::Scsi],
            Generation::Gen2 => &[ControllerType::Scsi],
        }
    }

    /// Bus used when a device does not name one.
    pub fn default_bus(&self) -> ControllerType {
        ControllerType::Scsi
    }

    /// Bus the root disk is always attached to.
    pub fn root_controller(&self) -> ControllerType {
        match self {
            Generation::Gen1 => ControllerType::Ide,
            Generation::Gen2 => ControllerType::Scsi,
        }
    }

    pub fn supports_bus(&self, bus: ControllerType) -> bool {
        self.valid_buses().contains(&bus)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Gen1 => write!(f, "Generation 1"),
            Generation::Gen2 => write!(f, "Generation 2"),
        }
    }
}

/// Pick the generation for a new VM.
///
/// The image's `hw_machine_type` property wins over the host default. The
/// result must be one of the generations the host supports, and a Gen2 VM
/// cannot boot from a legacy `.vhd` root disk.
pub fn resolve_vm_generation(
    image_meta: &ImageMeta,
    host_default: Generation,
    supported: &[Generation],
    root_vhd_format: Option<VhdFormat>,
) -> Result<Generation> {
    let generation = match image_meta.property(IMAGE_PROP_VM_GEN) {
        Some(value) => Generation::from_image_property(value)
            .ok_or_else(|| BlockDeviceError::UnsupportedGeneration(value.to_string()))?,
        None => host_default,
    };

    if !supported.contains(&generation) {
        return Err(BlockDeviceError::UnsupportedGeneration(
            generation.image_property().to_string(),
        ));
    }

    if generation != Generation::Gen1 && root_vhd_format == Some(VhdFormat::Vhd) {
        return Err(BlockDeviceError::IncompatibleVhdFormat(generation));
    }

    debug!(%generation, "Resolved VM generation");
    Ok(generation)
}
