//! Storage volume
//!
//! An encrypted shared file system with a mount target in every private
//! subnet, mounted read-write at `/config` on the primary container.

use crate::compute::{MountPoint, TaskDefinitionBuilder, VolumeSpec};
use crate::error::Result;
use crate::network::NetworkFabric;
use docstack_cloud::{DeletionPolicy, Expr, Resource, ResourceGraph};
use docstack_core::StackDefinition;

pub const VOLUME_NAME: &str = "volume";
pub const MOUNT_PATH: &str = "/config";

/// The declared file system as the task sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentVolume {
    pub file_system: String,
    pub mount_targets: Vec<String>,
    pub volume_name: String,
    pub mount_path: String,
    pub transit_encryption: bool,
}

impl PersistentVolume {
    /// Every resource the service must wait for before mounting
    pub fn resources(&self) -> Vec<&str> {
        std::iter::once(self.file_system.as_str())
            .chain(self.mount_targets.iter().map(String::as_str))
            .collect()
    }
}

/// Declares the file system and its mount targets and attaches the volume
pub fn declare(
    graph: &mut ResourceGraph,
    definition: &StackDefinition,
    fabric: &NetworkFabric,
    task: &mut TaskDefinitionBuilder,
) -> Result<PersistentVolume> {
    let file_system = graph.add(
        Resource::new(format!("{}Efs", definition.project), "AWS::EFS::FileSystem")
            .with_property("Encrypted", true)
            .with_deletion_policy(DeletionPolicy::Retain)
            .tagged_via("FileSystemTags"),
    )?;

    let mut mount_targets = Vec::new();
    for (index, subnet) in fabric.vpc.private_subnet_ids.iter().enumerate() {
        let id = graph.add(
            Resource::new(
                format!("{}MountTarget{}", file_system, index + 1),
                "AWS::EFS::MountTarget",
            )
            .with_property("FileSystemId", Expr::reference(&file_system))
            .with_property("SubnetId", subnet.as_str())
            .with_property("SecurityGroups", vec![fabric.group_id()]),
        )?;
        mount_targets.push(id);
    }

    task.add_volume(VolumeSpec {
        name: VOLUME_NAME.to_string(),
        file_system: Expr::reference(&file_system),
        transit_encryption: true,
    });
    task.add_mount_point(MountPoint {
        container_path: MOUNT_PATH.to_string(),
        source_volume: VOLUME_NAME.to_string(),
        read_only: false,
    });

    tracing::debug!(
        file_system = %file_system,
        mount_targets = mount_targets.len(),
        "Declared storage volume"
    );

    Ok(PersistentVolume {
        file_system,
        mount_targets,
        volume_name: VOLUME_NAME.to_string(),
        mount_path: MOUNT_PATH.to_string(),
        transit_encryption: true,
    })
}
