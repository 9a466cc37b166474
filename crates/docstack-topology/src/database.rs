//! Data store
//!
//! A single-AZ MySQL instance in the private subnets. Its endpoint is only
//! known after provisioning and reaches the task as a deferred value.

use crate::compute::TaskDefinitionBuilder;
use crate::error::Result;
use crate::network::NetworkFabric;
use crate::secret::CredentialSecret;
use docstack_cloud::{Deferred, DeletionPolicy, Expr, Output, Resource, ResourceGraph};
use docstack_core::StackDefinition;
use serde_json::{Value, json};

pub const SUBNET_GROUP_ID: &str = "RdsSubnetGroup";
pub const ENDPOINT_OUTPUT: &str = "RdsEndpoint";

const ENGINE: &str = "mysql";
const STORAGE_TYPE: &str = "gp2";
const PORT: u16 = 3306;

/// The declared database instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStoreInstance {
    pub logical_id: String,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage_gib: u32,
    pub storage_type: String,
    pub backup_retention_days: u32,
    pub multi_az: bool,
    pub deletion_protection: bool,
    pub port: u16,
    /// Resolved after provisioning
    pub endpoint: Deferred,
}

/// Declares the subnet group and instance and wires the connection settings
/// into the task environment
pub fn declare(
    graph: &mut ResourceGraph,
    definition: &StackDefinition,
    fabric: &NetworkFabric,
    secret: &CredentialSecret,
    task: &mut TaskDefinitionBuilder,
) -> Result<DataStoreInstance> {
    let settings = &definition.database;

    graph.add(
        Resource::new(SUBNET_GROUP_ID, "AWS::RDS::DBSubnetGroup")
            .with_property(
                "DBSubnetGroupDescription",
                format!("Subnet group for {} database", definition.project),
            )
            .with_property("SubnetIds", fabric.private_subnets())
            .taggable(),
    )?;

    let store = DataStoreInstance {
        logical_id: format!("{}Rds", definition.project),
        engine: ENGINE.to_string(),
        engine_version: settings.engine_version.clone(),
        instance_class: settings.instance_class.clone(),
        allocated_storage_gib: settings.allocated_storage_gib,
        storage_type: STORAGE_TYPE.to_string(),
        backup_retention_days: settings.backup_retention_days,
        multi_az: false,
        deletion_protection: false,
        port: PORT,
        endpoint: Deferred::new(format!("{}Rds", definition.project), "Endpoint.Address"),
    };

    graph.add(
        Resource::new(&store.logical_id, "AWS::RDS::DBInstance")
            .with_property("Engine", store.engine.as_str())
            .with_property("EngineVersion", store.engine_version.as_str())
            .with_property("DBInstanceClass", store.instance_class.as_str())
            .with_property("AllocatedStorage", store.allocated_storage_gib.to_string())
            .with_property("StorageType", store.storage_type.as_str())
            .with_property("BackupRetentionPeriod", store.backup_retention_days)
            .with_property("MultiAZ", store.multi_az)
            .with_property("DeletionProtection", store.deletion_protection)
            .with_property("AutoMinorVersionUpgrade", true)
            .with_property("PubliclyAccessible", false)
            .with_property("CopyTagsToSnapshot", true)
            .with_property("DBName", secret.database_name.as_str())
            .with_property("DBSubnetGroupName", Expr::reference(SUBNET_GROUP_ID))
            .with_property("VPCSecurityGroups", json!([Value::from(fabric.group_id())]))
            .with_property("MasterUsername", secret.field_reference("username"))
            .with_property("MasterUserPassword", secret.field_reference("password"))
            .with_deletion_policy(DeletionPolicy::Delete)
            .taggable(),
    )?;

    graph.add_output(
        Output::new(ENDPOINT_OUTPUT, store.endpoint.to_json())
            .with_description("Database endpoint address"),
    )?;

    task.add_environment("DB_HOST", store.endpoint.clone())?;
    task.add_environment("DB_PORT", store.port.to_string())?;
    task.add_environment("DB_USER", secret.username.as_str())?;
    task.add_environment("DB_DATABASE", secret.database_name.as_str())?;

    tracing::debug!(
        instance = %store.logical_id,
        class = %store.instance_class,
        engine_version = %store.engine_version,
        "Declared data store"
    );
    Ok(store)
}
