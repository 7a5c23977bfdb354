use core::fmt;
use std::str::FromStr;

/// Slots on one IDE controller. Gen1 VMs have two IDE controllers.
pub const IDE_CONTROLLER_SLOTS: u32 = 2;
/// IDE controllers per Gen1 VM.
pub const IDE_CONTROLLER_COUNT: u32 = 2;
/// Slots on the VM's SCSI controller.
pub const SCSI_CONTROLLER_SLOTS: u32 = 64;

/// Disk controller (bus) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControllerType {
    Ide,
    Scsi,
}

impl ControllerType {
    /// Total slot capacity of this bus on a freshly created VM.
    pub fn capacity(&self) -> u32 {
        match self {
            ControllerType::Ide => IDE_CONTROLLER_SLOTS * IDE_CONTROLLER_COUNT,
            ControllerType::Scsi => SCSI_CONTROLLER_SLOTS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerType::Ide => "IDE",
            ControllerType::Scsi => "SCSI",
        }
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerType {
    type Err = String;

    /// Accepts `ide`/`scsi` in any case, as the orchestrator sends them lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ide") {
            Ok(ControllerType::Ide)
        } else if s.eq_ignore_ascii_case("scsi") {
            Ok(ControllerType::Scsi)
        } else {
            Err(s.to_string())
        }
    }
}
