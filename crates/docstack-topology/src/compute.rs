//! Compute definition
//!
//! The task is assembled on a [`TaskDefinitionBuilder`]. Storage and the data
//! store add volumes, mounts and environment to it; [`TaskDefinitionBuilder::seal`]
//! then declares the task and returns a [`TaskDefinition`], which has no
//! mutators. The service runner only accepts the sealed form.

use crate::error::{Result, TopologyError};
use crate::lookups::ResolvedLookups;
use crate::naming::ResolvedNames;
use crate::secret::CredentialSecret;
use docstack_cloud::{Deferred, DeletionPolicy, Expr, Pseudo, Resource, ResourceGraph};
use docstack_core::{DeploymentProfile, StackDefinition};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const TASK_DEFINITION_ID: &str = "TaskDefinition";
pub const TASK_ROLE_ID: &str = "TaskRole";
pub const EXECUTION_ROLE_ID: &str = "ExecutionRole";
pub const TASK_POLICY_ID: &str = "TaskRoleDefaultPolicy";
pub const EXECUTION_POLICY_ID: &str = "ExecutionRoleDefaultPolicy";
pub const CONTAINER_LOG_GROUP_ID: &str = "ContainerLogGroup";
pub const LOG_ROUTER_LOG_GROUP_ID: &str = "LogRouterLogGroup";

/// Name of the log-router sidecar container
pub const LOG_ROUTER_CONTAINER: &str = "firelense";

const LOG_RETENTION_DAYS: u32 = 1;

/// Plain environment value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(String),
    /// Resolved once the producing resource exists
    Deferred(Deferred),
}

impl EnvValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            EnvValue::Literal(s) => Some(s),
            EnvValue::Deferred(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            EnvValue::Literal(s) => Value::String(s.clone()),
            EnvValue::Deferred(d) => d.to_json(),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Literal(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Literal(value)
    }
}

impl From<Deferred> for EnvValue {
    fn from(value: Deferred) -> Self {
        EnvValue::Deferred(value)
    }
}

/// A secret injected into the container at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSource {
    pub parameter_path: String,
    pub value_from: Expr,
}

impl SecretSource {
    pub fn from_parameter(secret: &CredentialSecret) -> Self {
        Self {
            parameter_path: secret.parameter_path.clone(),
            value_from: secret.parameter_arn.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub container_path: String,
    pub source_volume: String,
    pub read_only: bool,
}

/// Task volume backed by a shared file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: String,
    pub file_system: Expr,
    pub transit_encryption: bool,
}

impl VolumeSpec {
    fn to_json(&self) -> Value {
        json!({
            "Name": self.name,
            "EFSVolumeConfiguration": {
                "FilesystemId": Value::from(self.file_system.clone()),
                "TransitEncryption": if self.transit_encryption { "ENABLED" } else { "DISABLED" },
            }
        })
    }
}

/// An IAM policy statement granting `actions` on `resources`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Expr>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
        }
    }

    fn to_json(&self) -> Value {
        let actions: Value = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resources: Vec<Value> = self.resources.iter().map(Expr::to_json).collect();
        let resources = match resources.len() {
            1 => resources.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Array(resources),
        };
        json!({
            "Action": actions,
            "Effect": "Allow",
            "Resource": resources,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub port: Option<u16>,
    pub environment: BTreeMap<String, EnvValue>,
    pub secrets: BTreeMap<String, SecretSource>,
    pub mount_points: Vec<MountPoint>,
    /// Logical id of the log group
    pub log_group: String,
    pub stream_prefix: String,
}

impl ContainerDefinition {
    fn new(name: String, image: String, log_group: &str, stream_prefix: String) -> Self {
        Self {
            name,
            image,
            essential: true,
            port: None,
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
            mount_points: Vec::new(),
            log_group: log_group.to_string(),
            stream_prefix,
        }
    }

    pub fn env(&self, key: &str) -> Option<&EnvValue> {
        self.environment.get(key)
    }

    pub fn secret(&self, key: &str) -> Option<&SecretSource> {
        self.secrets.get(key)
    }

    fn to_json(&self) -> Value {
        let mut container = json!({
            "Name": self.name,
            "Image": self.image,
            "Essential": self.essential,
            "LogConfiguration": {
                "LogDriver": "awslogs",
                "Options": {
                    "awslogs-group": Value::from(Expr::reference(&self.log_group)),
                    "awslogs-stream-prefix": self.stream_prefix,
                    "awslogs-region": Value::from(Expr::from(Pseudo::Region)),
                }
            },
        });

        if let Some(port) = self.port {
            container["PortMappings"] = json!([{ "ContainerPort": port, "Protocol": "tcp" }]);
        }
        if !self.environment.is_empty() {
            container["Environment"] = self
                .environment
                .iter()
                .map(|(name, value)| json!({ "Name": name, "Value": value.to_json() }))
                .collect();
        }
        if !self.secrets.is_empty() {
            container["Secrets"] = self
                .secrets
                .iter()
                .map(|(name, source)| {
                    json!({ "Name": name, "ValueFrom": Value::from(source.value_from.clone()) })
                })
                .collect();
        }
        if !self.mount_points.is_empty() {
            container["MountPoints"] = self
                .mount_points
                .iter()
                .map(|m| {
                    json!({
                        "ContainerPath": m.container_path,
                        "SourceVolume": m.source_volume,
                        "ReadOnly": m.read_only,
                    })
                })
                .collect();
        }
        container
    }
}

/// Mutable task under construction
#[derive(Debug)]
pub struct TaskDefinitionBuilder {
    family: String,
    cpu: u32,
    memory_mib: u32,
    primary: ContainerDefinition,
    sidecar: Option<ContainerDefinition>,
    volumes: Vec<VolumeSpec>,
    task_statements: Vec<PolicyStatement>,
    execution_statements: Vec<PolicyStatement>,
}

impl TaskDefinitionBuilder {
    /// Declares the roles and log groups and starts the task with its primary
    /// container, base environment and the `DB_PASS` secret
    pub fn declare(
        graph: &mut ResourceGraph,
        definition: &StackDefinition,
        profile: &DeploymentProfile,
        names: &ResolvedNames,
        lookups: &ResolvedLookups,
        secret: &CredentialSecret,
    ) -> Result<Self> {
        for role in [TASK_ROLE_ID, EXECUTION_ROLE_ID] {
            graph.add(
                Resource::new(role, "AWS::IAM::Role")
                    .with_property("AssumeRolePolicyDocument", ecs_tasks_trust_policy())
                    .taggable(),
            )?;
        }

        graph.add(log_group(CONTAINER_LOG_GROUP_ID))?;
        if profile.log_router {
            graph.add(log_group(LOG_ROUTER_LOG_GROUP_ID))?;
        }

        let mut primary = ContainerDefinition::new(
            format!("{}Container", definition.project),
            definition.image.clone(),
            CONTAINER_LOG_GROUP_ID,
            format!("{}-container", names.stack_id),
        );
        primary.port = Some(profile.container_port);

        let sidecar = profile.log_router.then(|| {
            let mut sidecar = ContainerDefinition::new(
                LOG_ROUTER_CONTAINER.to_string(),
                definition.log_router_image.clone(),
                LOG_ROUTER_LOG_GROUP_ID,
                format!("{}-firelense", names.stack_id),
            );
            sidecar.essential = false;
            sidecar
        });

        let mut builder = Self {
            family: format!("{}TaskDef", names.stack_id),
            cpu: definition.task.cpu,
            memory_mib: definition.task.memory_mib,
            primary,
            sidecar,
            volumes: Vec::new(),
            task_statements: Vec::new(),
            execution_statements: Vec::new(),
        };

        builder.add_environment("TZ", "Etc/UTC")?;
        builder.add_environment("APP_URL", names.full_url.as_str())?;
        builder.add_secret("DB_PASS", SecretSource::from_parameter(secret))?;

        builder.add_task_statement(PolicyStatement::allow(
            &["sts:AssumeRole"],
            vec![format!("arn:aws:iam::{}:*", lookups.account_number).into()],
        ));
        let log_groups = builder.log_group_arns();
        builder.add_execution_statement(PolicyStatement::allow(
            &["logs:CreateLogStream", "logs:PutLogEvents"],
            log_groups,
        ));
        builder.add_execution_statement(PolicyStatement::allow(
            &["ssm:GetParameter", "ssm:GetParameters"],
            vec![secret.parameter_arn.clone()],
        ));

        tracing::debug!(
            family = %builder.family,
            container = %builder.primary.name,
            log_router = profile.log_router,
            "Started task definition"
        );
        Ok(builder)
    }

    /// Adds a plain variable to the primary container
    pub fn add_environment(&mut self, key: &str, value: impl Into<EnvValue>) -> Result<()> {
        if self.primary.secrets.contains_key(key) {
            return Err(TopologyError::EnvironmentSecretConflict(key.to_string()));
        }
        self.primary.environment.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Adds a secret to the primary container
    pub fn add_secret(&mut self, key: &str, source: SecretSource) -> Result<()> {
        if self.primary.environment.contains_key(key) {
            return Err(TopologyError::EnvironmentSecretConflict(key.to_string()));
        }
        self.primary.secrets.insert(key.to_string(), source);
        Ok(())
    }

    pub fn add_mount_point(&mut self, mount: MountPoint) {
        self.primary.mount_points.push(mount);
    }

    pub fn add_volume(&mut self, volume: VolumeSpec) {
        self.volumes.push(volume);
    }

    pub fn add_task_statement(&mut self, statement: PolicyStatement) {
        self.task_statements.push(statement);
    }

    pub fn add_execution_statement(&mut self, statement: PolicyStatement) {
        self.execution_statements.push(statement);
    }

    pub fn primary(&self) -> &ContainerDefinition {
        &self.primary
    }

    fn log_group_arns(&self) -> Vec<Expr> {
        std::iter::once(&self.primary)
            .chain(self.sidecar.as_ref())
            .map(|c| Expr::attr(&c.log_group, "Arn"))
            .collect()
    }

    /// Declares the role policies and the task definition
    pub fn seal(self, graph: &mut ResourceGraph) -> Result<TaskDefinition> {
        let declared: Vec<&str> = self.volumes.iter().map(|v| v.name.as_str()).collect();
        for container in std::iter::once(&self.primary).chain(self.sidecar.as_ref()) {
            if let Some(mount) = container
                .mount_points
                .iter()
                .find(|m| !declared.contains(&m.source_volume.as_str()))
            {
                return Err(TopologyError::UnknownVolume {
                    path: mount.container_path.clone(),
                    volume: mount.source_volume.clone(),
                });
            }
        }

        graph.add(role_policy(TASK_POLICY_ID, TASK_ROLE_ID, &self.task_statements))?;
        graph.add(role_policy(
            EXECUTION_POLICY_ID,
            EXECUTION_ROLE_ID,
            &self.execution_statements,
        ))?;

        let containers: Vec<Value> = std::iter::once(&self.primary)
            .chain(self.sidecar.as_ref())
            .map(ContainerDefinition::to_json)
            .collect();

        let mut task = Resource::new(TASK_DEFINITION_ID, "AWS::ECS::TaskDefinition")
            .with_property("Family", self.family.as_str())
            .with_property("Cpu", self.cpu.to_string())
            .with_property("Memory", self.memory_mib.to_string())
            .with_property("NetworkMode", "awsvpc")
            .with_property("RequiresCompatibilities", json!(["FARGATE"]))
            .with_property("TaskRoleArn", Expr::attr(TASK_ROLE_ID, "Arn"))
            .with_property("ExecutionRoleArn", Expr::attr(EXECUTION_ROLE_ID, "Arn"))
            .with_property("ContainerDefinitions", containers)
            .with_dependency(EXECUTION_POLICY_ID)
            .taggable();
        if !self.volumes.is_empty() {
            let volumes: Vec<Value> = self.volumes.iter().map(VolumeSpec::to_json).collect();
            task.set_property("Volumes", volumes);
        }
        graph.add(task)?;

        tracing::debug!(
            family = %self.family,
            environment = self.primary.environment.len(),
            secrets = self.primary.secrets.len(),
            volumes = self.volumes.len(),
            "Sealed task definition"
        );

        Ok(TaskDefinition {
            logical_id: TASK_DEFINITION_ID.to_string(),
            family: self.family,
            cpu: self.cpu,
            memory_mib: self.memory_mib,
            primary: self.primary,
            sidecar: self.sidecar,
            volumes: self.volumes,
            task_policy: TASK_POLICY_ID.to_string(),
            execution_policy: EXECUTION_POLICY_ID.to_string(),
        })
    }
}

/// A declared task definition. Read-only.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub logical_id: String,
    pub family: String,
    pub cpu: u32,
    pub memory_mib: u32,
    primary: ContainerDefinition,
    sidecar: Option<ContainerDefinition>,
    volumes: Vec<VolumeSpec>,
    pub task_policy: String,
    pub execution_policy: String,
}

impl TaskDefinition {
    pub fn primary(&self) -> &ContainerDefinition {
        &self.primary
    }

    pub fn sidecar(&self) -> Option<&ContainerDefinition> {
        self.sidecar.as_ref()
    }

    pub fn volumes(&self) -> &[VolumeSpec] {
        &self.volumes
    }

    /// Port of the primary container
    pub fn container_port(&self) -> Option<u16> {
        self.primary.port
    }
}

fn ecs_tasks_trust_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": "ecs-tasks.amazonaws.com" },
        }]
    })
}

fn log_group(logical_id: &str) -> Resource {
    Resource::new(logical_id, "AWS::Logs::LogGroup")
        .with_property("RetentionInDays", LOG_RETENTION_DAYS)
        .with_deletion_policy(DeletionPolicy::Retain)
        .taggable()
}

fn role_policy(logical_id: &str, role: &str, statements: &[PolicyStatement]) -> Resource {
    let statements: Vec<Value> = statements.iter().map(PolicyStatement::to_json).collect();
    Resource::new(logical_id, "AWS::IAM::Policy")
        .with_property("PolicyName", logical_id)
        .with_property(
            "PolicyDocument",
            json!({ "Version": "2012-10-17", "Statement": statements }),
        )
        .with_property("Roles", json!([Value::from(Expr::reference(role))]))
}
