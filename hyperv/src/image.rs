//! Image metadata consumed by placement and generation resolution.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Image property selecting the VM generation.
pub const IMAGE_PROP_VM_GEN: &str = "hw_machine_type";

/// Subset of the image service's metadata the driver looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageMeta {
    /// Disk format, e.g. `vhd` or `iso`.
    #[serde(default)]
    pub disk_format: Option<String>,
    /// Free-form image properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ImageMeta {
    pub fn with_disk_format(disk_format: impl Into<String>) -> Self {
        Self {
            disk_format: Some(disk_format.into()),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// On-disk format of a root virtual hard disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VhdFormat {
    /// Legacy VHD (Gen1 only).
    Vhd,
    /// VHDX.
    Vhdx,
}

impl VhdFormat {
    /// Detect from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("vhd") {
            Some(VhdFormat::Vhd)
        } else if ext.eq_ignore_ascii_case("vhdx") {
            Some(VhdFormat::Vhdx)
        } else {
            None
        }
    }
}
