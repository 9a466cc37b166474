//! Topology builder
//!
//! Turns one environment of a stack definition into a validated resource
//! graph. Lookups and the zone check run first; nothing is declared unless
//! all of them succeed.

use crate::compute::{TaskDefinition, TaskDefinitionBuilder};
use crate::database::{self, DataStoreInstance};
use crate::dns::{self, DnsRecord};
use crate::edge::{self, EdgeRouter};
use crate::error::Result;
use crate::lookups;
use crate::naming::{self, ResolvedNames};
use crate::network::{self, NetworkFabric};
use crate::secret::{self, CredentialSecret};
use crate::service::{self, ServiceRunner};
use crate::storage::{self, PersistentVolume};
use docstack_cloud::{Expr, LookupSource, Plan, Pseudo, ResourceGraph, Template};
use docstack_core::{DeploymentProfile, StackDefinition};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::instrument;

/// Rule id asserting the deployment region
pub const REGION_RULE: &str = "DeploymentRegion";

/// One environment's complete topology
#[derive(Debug, Clone)]
pub struct StackTopology {
    pub stack_id: String,
    /// Region the template must be deployed to
    pub region: String,
    pub profile: DeploymentProfile,
    pub names: ResolvedNames,
    /// Stack tags applied to every taggable resource
    pub tags: BTreeMap<String, String>,
    pub graph: ResourceGraph,
    pub secret: CredentialSecret,
    pub network: NetworkFabric,
    pub task: TaskDefinition,
    pub volume: PersistentVolume,
    pub store: DataStoreInstance,
    pub service: ServiceRunner,
    pub edge: EdgeRouter,
    pub dns: DnsRecord,
}

impl StackTopology {
    /// Renders the deployment template. Deploying it outside `region` fails.
    pub fn template(&self) -> Result<Template> {
        let description = format!(
            "{} deployment for environment {} in {}",
            self.names.stack_id, self.profile.environment, self.region
        );
        let template = Template::render(&self.graph, Some(description), &self.tags)?
            .with_equals_rule(
                REGION_RULE,
                Value::from(Expr::from(Pseudo::Region)),
                Value::String(self.region.clone()),
                format!("{} must be deployed to {}", self.stack_id, self.region),
            );
        Ok(template)
    }

    /// Creation waves for the operator
    pub fn plan(&self) -> Result<Plan> {
        Ok(Plan::from_graph(&self.stack_id, &self.graph)?)
    }
}

pub struct TopologyBuilder<'a> {
    definition: &'a StackDefinition,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(definition: &'a StackDefinition) -> Self {
        Self { definition }
    }

    /// Builds the topology of one environment
    #[instrument(skip(self, source))]
    pub fn build(&self, environment: &str, source: &dyn LookupSource) -> Result<StackTopology> {
        let definition = self.definition;
        let profile = definition.profile(environment)?;
        let names = naming::resolve(definition, &profile);
        let resolved = lookups::resolve(source, definition, &names)?;
        dns::check_zone(&names.hostname, &definition.zone)?;

        let mut graph = ResourceGraph::new();

        let secret = secret::provision(&mut graph, &names)?;
        let network = network::declare(&mut graph, &profile.exposure, &resolved.vpc)?;

        let mut task = TaskDefinitionBuilder::declare(
            &mut graph, definition, &profile, &names, &resolved, &secret,
        )?;
        let volume = storage::declare(&mut graph, definition, &network, &mut task)?;
        let store = database::declare(&mut graph, definition, &network, &secret, &mut task)?;
        service::prepare(&mut task);
        let task = task.seal(&mut graph)?;

        let service = service::declare(
            &mut graph, definition, &names, &task, &network, &volume, &store,
        )?;
        let edge = edge::declare(
            &mut graph, &names, &profile, &resolved, &network, &task, &service,
        )?;
        let dns = dns::declare(&mut graph, &names, &resolved, &edge)?;

        graph.validate()?;

        let mut tags = BTreeMap::new();
        tags.insert("Service".to_string(), definition.project.clone());
        tags.insert("Environment".to_string(), profile.environment.to_string());

        tracing::info!(
            stack = %names.stack_id,
            hostname = %names.hostname,
            resources = graph.len(),
            "Built topology"
        );

        Ok(StackTopology {
            stack_id: names.stack_id.clone(),
            region: definition.region.clone(),
            profile,
            names,
            tags,
            graph,
            secret,
            network,
            task,
            volume,
            store,
            service,
            edge,
            dns,
        })
    }

    /// Builds every declared environment independently
    pub fn build_all(&self, source: &dyn LookupSource) -> Result<Vec<StackTopology>> {
        self.definition
            .environment_names()
            .into_iter()
            .map(|env| self.build(env, source))
            .collect()
    }
}
