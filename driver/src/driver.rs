//! Clustered Hyper-V compute driver
//!
//! Wraps a base compute driver: block devices are validated and placed before
//! the base driver creates a VM, new VMs are made highly available, and the
//! failover listener runs for the driver's lifetime.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use clus::{ClusterOps, Collaborators, Instance};
use hyperv_storage::{
    resolve_vm_generation, BlockDeviceInfo, BlockDeviceInfoManager, BlockDeviceLayout,
    Generation, ImageMeta, InstanceSpec, RootDisk, VhdFormat,
};

use crate::config::Config;
use crate::error::{BoxError, DriverError, Result};

/// The underlying single-host compute driver.
pub trait ComputeDriver: Send + Sync {
    /// Create and start the VM with the validated devices.
    fn spawn(
        &self,
        instance: &Instance,
        layout: &BlockDeviceLayout,
        root: &RootDisk,
    ) -> std::result::Result<(), BoxError>;

    fn destroy(&self, instance: &Instance) -> std::result::Result<(), BoxError>;

    fn post_live_migration_at_destination(
        &self,
        instance: &Instance,
    ) -> std::result::Result<(), BoxError>;
}

/// Compute driver for VMs on a Hyper-V failover cluster node.
pub struct HyperVClusterDriver<D> {
    base: D,
    block_devices: BlockDeviceInfoManager,
    cluster_ops: Arc<ClusterOps>,
    host_default_generation: Generation,
    supported_generations: Vec<Generation>,
}

impl<D: ComputeDriver> HyperVClusterDriver<D> {
    /// Build the driver and start the failover listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(base: D, collaborators: Collaborators, config: &Config) -> Result<Self> {
        let cluster_ops = Arc::new(ClusterOps::new(
            collaborators,
            config.cluster_ops_config(),
        )?);
        cluster_ops.start_failover_listener()?;

        info!(
            node = %cluster_ops.this_node(),
            force_config_drive = config.hyperv.force_config_drive,
            "Hyper-V cluster driver started"
        );

        Ok(Self {
            base,
            block_devices: BlockDeviceInfoManager::new()
                .with_force_config_drive(config.hyperv.force_config_drive),
            cluster_ops,
            host_default_generation: Generation::Gen1,
            supported_generations: vec![Generation::Gen1, Generation::Gen2],
        })
    }

    /// Restrict the generations this host can run, and pick its default.
    pub fn with_generations(mut self, host_default: Generation, supported: &[Generation]) -> Self {
        self.host_default_generation = host_default;
        self.supported_generations = supported.to_vec();
        self
    }

    pub fn cluster_ops(&self) -> &Arc<ClusterOps> {
        &self.cluster_ops
    }

    pub fn base(&self) -> &D {
        &self.base
    }

    /// Validate block devices, create the VM and add it to the cluster.
    ///
    /// `root_vhd_path` is the cached root image, when booting from one.
    /// Nothing reaches the base driver unless placement succeeds.
    pub fn spawn(
        &self,
        instance: &Instance,
        image_meta: &ImageMeta,
        block_device_info: &BlockDeviceInfo,
        root_vhd_path: Option<&Path>,
    ) -> Result<()> {
        let generation = resolve_vm_generation(
            image_meta,
            self.host_default_generation,
            &self.supported_generations,
            root_vhd_path.and_then(VhdFormat::from_path),
        )?;

        let spec = InstanceSpec {
            name: instance.name.clone(),
            config_drive: instance.config_drive,
        };
        let mut layout =
            self.block_devices
                .validate_and_update(&spec, image_meta, generation, block_device_info)?;
        let root = layout.get_root_device()?;

        debug!(
            instance = %instance.name,
            %generation,
            root_bus = %root.disk_bus,
            ephemerals = layout.ephemerals().len(),
            volumes = layout.volumes().len(),
            "Block devices placed"
        );

        self.base
            .spawn(instance, &layout, &root)
            .map_err(|source| DriverError::Compute {
                operation: "spawn",
                instance: instance.name.clone(),
                source,
            })?;

        self.cluster_ops.add_to_cluster(instance);
        Ok(())
    }

    /// Remove the VM from the cluster, then destroy it.
    pub fn destroy(&self, instance: &Instance) -> Result<()> {
        self.cluster_ops.remove_from_cluster(instance);
        self.base
            .destroy(instance)
            .map_err(|source| DriverError::Compute {
                operation: "destroy",
                instance: instance.name.clone(),
                source,
            })
    }

    /// Claim a live-migrated VM for this node before the base hook runs.
    pub fn post_live_migration_at_destination(&self, instance: &Instance) -> Result<()> {
        self.cluster_ops.post_migration(instance);
        self.base
            .post_live_migration_at_destination(instance)
            .map_err(|source| DriverError::Compute {
                operation: "finish migration of",
                instance: instance.name.clone(),
                source,
            })
    }
}
