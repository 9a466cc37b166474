//! Service runner
//!
//! The cluster and the Fargate service running the sealed task. The service
//! waits explicitly for storage, the data store and the task role policy.

use crate::compute::{PolicyStatement, TaskDefinition, TaskDefinitionBuilder};
use crate::database::DataStoreInstance;
use crate::error::Result;
use crate::naming::ResolvedNames;
use crate::network::NetworkFabric;
use crate::storage::PersistentVolume;
use docstack_cloud::{Expr, Output, Resource, ResourceGraph};
use docstack_core::StackDefinition;
use serde_json::{Value, json};

pub const CLUSTER_ID: &str = "Cluster";
pub const CLUSTER_OUTPUT: &str = "EcsClusterId";

const DESIRED_COUNT: u32 = 1;

/// The declared cluster and service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRunner {
    pub cluster: String,
    pub cluster_name: String,
    pub service: String,
    pub desired_count: u32,
    pub execute_command: bool,
    /// Explicit creation-order edges of the service
    pub waits_for: Vec<String>,
}

/// Grants what execute-command needs. Runs before the task is sealed.
pub fn prepare(task: &mut TaskDefinitionBuilder) {
    task.add_task_statement(PolicyStatement::allow(
        &[
            "ssmmessages:CreateControlChannel",
            "ssmmessages:CreateDataChannel",
            "ssmmessages:OpenControlChannel",
            "ssmmessages:OpenDataChannel",
        ],
        vec!["*".into()],
    ));
}

pub fn declare(
    graph: &mut ResourceGraph,
    definition: &StackDefinition,
    names: &ResolvedNames,
    task: &TaskDefinition,
    fabric: &NetworkFabric,
    volume: &PersistentVolume,
    store: &DataStoreInstance,
) -> Result<ServiceRunner> {
    graph.add(
        Resource::new(CLUSTER_ID, "AWS::ECS::Cluster")
            .with_property("ClusterName", names.cluster_name.as_str())
            .taggable(),
    )?;

    let service_id = format!("{}Service", definition.project);
    graph.add(
        Resource::new(&service_id, "AWS::ECS::Service")
            .with_property("Cluster", Expr::reference(CLUSTER_ID))
            .with_property("TaskDefinition", Expr::reference(&task.logical_id))
            .with_property("DesiredCount", DESIRED_COUNT)
            .with_property("LaunchType", "FARGATE")
            .with_property("EnableExecuteCommand", true)
            .with_property(
                "DeploymentConfiguration",
                json!({ "MaximumPercent": 200, "MinimumHealthyPercent": 50 }),
            )
            .with_property(
                "NetworkConfiguration",
                json!({
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": "DISABLED",
                        "SecurityGroups": [Value::from(fabric.group_id())],
                        "Subnets": fabric.private_subnets(),
                    }
                }),
            )
            .taggable(),
    )?;

    let mut waits_for: Vec<String> = volume.resources().into_iter().map(String::from).collect();
    waits_for.push(store.logical_id.clone());
    waits_for.push(task.task_policy.clone());
    for target in &waits_for {
        graph.add_dependency(&service_id, target)?;
    }

    graph.add_output(
        Output::new(CLUSTER_OUTPUT, Expr::reference(CLUSTER_ID)).with_description("ECS cluster name"),
    )?;

    tracing::debug!(
        service = %service_id,
        cluster = %names.cluster_name,
        waits_for = waits_for.len(),
        "Declared service runner"
    );

    Ok(ServiceRunner {
        cluster: CLUSTER_ID.to_string(),
        cluster_name: names.cluster_name.clone(),
        service: service_id,
        desired_count: DESIRED_COUNT,
        execute_command: true,
        waits_for,
    })
}
