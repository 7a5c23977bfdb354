//! # hyperv-storage
//!
//! Block device placement for Hyper-V instances.
//!
//! Before a VM is created, every ephemeral disk and volume the orchestrator
//! requested has to land on a controller the VM generation actually has, and
//! the controllers have a fixed number of slots. This crate validates those
//! requests, assigns buses, orders devices for boot and resolves the root
//! device. It is pure logic: no hypervisor calls are made.
//!
//! ## Example
//!
//! ```
//! use hyperv_storage::{
//!     BlockDeviceInfo, BlockDeviceInfoManager, Generation, ImageMeta, InstanceSpec,
//!     RootDiskType,
//! };
//!
//! fn main() -> hyperv_storage::Result<()> {
//!     let manager = BlockDeviceInfoManager::new();
//!     let instance = InstanceSpec {
//!         name: "instance-00000001".to_string(),
//!         config_drive: true,
//!     };
//!     let image = ImageMeta::with_disk_format("vhd");
//!
//!     let mut layout = manager.validate_and_update(
//!         &instance,
//!         &image,
//!         Generation::Gen1,
//!         &BlockDeviceInfo::default(),
//!     )?;
//!     let root = layout.get_root_device()?;
//!     assert_eq!(root.kind, RootDiskType::Disk);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod image;
pub mod storage;
pub mod vm;

pub use error::{BlockDeviceError, DeviceRole, Result};
pub use image::{ImageMeta, VhdFormat, IMAGE_PROP_VM_GEN};

pub use storage::{
    BlockDevice, BlockDeviceInfo, BlockDeviceInfoManager, BlockDeviceLayout, ControllerSlotPool,
    ControllerType, DeviceSpec, DeviceType, InstanceSpec, RootDisk, RootDiskType,
    DEFAULT_ROOT_DEVICE,
};

pub use vm::{resolve_vm_generation, Generation};
