mod block_device;
mod controller;
mod slots;

pub use block_device::{
    BlockDevice, BlockDeviceInfo, BlockDeviceInfoManager, BlockDeviceLayout, DeviceSpec,
    DeviceType, InstanceSpec, RootDisk, RootDiskType, DEFAULT_ROOT_DEVICE,
};
pub use controller::{
    ControllerType, IDE_CONTROLLER_COUNT, IDE_CONTROLLER_SLOTS, SCSI_CONTROLLER_SLOTS,
};
pub use slots::ControllerSlotPool;
