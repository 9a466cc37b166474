//! Shared fixture for component tests

use crate::compute::TaskDefinitionBuilder;
use crate::lookups;
use crate::naming::{self, ResolvedNames};
use crate::network::{self, NetworkFabric};
use crate::secret::{self, CredentialSecret};
use docstack_cloud::{LookupContext, ParameterEntry, ResourceGraph, VpcAttributes};
use docstack_core::{StackDefinition, parse_stack_string};

/// devA with its secret, network and an unsealed task already declared
pub struct Stage {
    pub definition: StackDefinition,
    pub names: ResolvedNames,
    pub graph: ResourceGraph,
    pub secret: CredentialSecret,
    pub network: NetworkFabric,
    pub task: TaskDefinitionBuilder,
}

pub fn dev_stage() -> Stage {
    let definition = parse_stack_string(
        r#"
        domain "docs.wmaug.org"
        zone "wmaug.org"
        image "lscr.io/linuxserver/bookstack:latest"
        environment "devA" {
            exposure "public"
            container-port 80
            health-check path="/login" codes="200,302"
        }
        "#,
    )
    .unwrap();
    let profile = definition.profile("devA").unwrap();
    let names = naming::resolve(&definition, &profile);
    let ctx = LookupContext::new()
        .with_parameter("/all/awsAccountNumber", ParameterEntry::plain("123456789012"))
        .with_parameter(
            "/all/aws/route53/wmaug.org/hostedZoneId",
            ParameterEntry::plain("Z0123456789"),
        )
        .with_parameter("/devA/BookStack/DB_PASS", ParameterEntry::secure(2))
        .with_vpc(
            "devAVpc",
            VpcAttributes {
                vpc_id: "vpc-0a1b".to_string(),
                private_subnet_ids: vec!["subnet-p1".to_string(), "subnet-p2".to_string()],
                public_subnet_ids: vec!["subnet-u1".to_string(), "subnet-u2".to_string()],
            },
        );
    let resolved = lookups::resolve(&ctx, &definition, &names).unwrap();

    let mut graph = ResourceGraph::new();
    let secret = secret::provision(&mut graph, &names).unwrap();
    let network = network::declare(&mut graph, &profile.exposure, &resolved.vpc).unwrap();
    let task = TaskDefinitionBuilder::declare(
        &mut graph,
        &definition,
        &profile,
        &names,
        &resolved,
        &secret,
    )
    .unwrap();

    Stage {
        definition,
        names,
        graph,
        secret,
        network,
        task,
    }
}
