//! Network fabric
//!
//! One security group shared by every component. Ingress is the
//! self-referencing all-traffic rule plus HTTP and HTTPS from the source
//! range the exposure variant selects.

use crate::error::Result;
use docstack_cloud::{Expr, Resource, ResourceGraph, VpcAttributes};
use docstack_core::Exposure;
use serde_json::{Value, json};

pub const SECURITY_GROUP_ID: &str = "SecurityGroup";
pub const SELF_INGRESS_ID: &str = "SecurityGroupSelfIngress";

const GROUP_DESCRIPTION: &str = "Allow inter-component traffic for BookStack ECS Service";

/// Traffic source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// Members of the same security group
    SelfReference,
    Cidr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSpec {
    AllTraffic,
    Tcp(u16),
}

impl PortSpec {
    fn protocol(&self) -> &'static str {
        match self {
            PortSpec::AllTraffic => "-1",
            PortSpec::Tcp(_) => "tcp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub source: Peer,
    pub port: PortSpec,
    pub description: String,
}

impl IngressRule {
    fn new(source: Peer, port: PortSpec, description: &str) -> Self {
        Self {
            source,
            port,
            description: description.to_string(),
        }
    }

    /// Inline rule for the group's `SecurityGroupIngress` list.
    /// Self-references have no inline form and yield `None`.
    fn to_inline_json(&self) -> Option<Value> {
        let Peer::Cidr(cidr) = &self.source else {
            return None;
        };
        let mut rule = json!({
            "CidrIp": cidr,
            "IpProtocol": self.port.protocol(),
            "Description": self.description,
        });
        if let PortSpec::Tcp(port) = self.port {
            rule["FromPort"] = json!(port);
            rule["ToPort"] = json!(port);
        }
        Some(rule)
    }
}

/// Ingress and egress policy of the shared security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBoundary {
    pub rules: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl NetworkBoundary {
    /// Boundary for an exposure variant: self rule, one HTTP rule, one HTTPS rule
    pub fn for_exposure(exposure: &Exposure) -> Self {
        let source = exposure.source_cidr().to_string();
        Self {
            rules: vec![
                IngressRule::new(Peer::SelfReference, PortSpec::AllTraffic, "Self referencing rule"),
                IngressRule::new(Peer::Cidr(source.clone()), PortSpec::Tcp(80), "Allow HTTP traffic"),
                IngressRule::new(Peer::Cidr(source), PortSpec::Tcp(443), "Allow HTTPS traffic"),
            ],
            allow_all_outbound: true,
        }
    }

    /// Rules opening one TCP port
    pub fn rules_for_port(&self, port: u16) -> Vec<&IngressRule> {
        self.rules
            .iter()
            .filter(|r| r.port == PortSpec::Tcp(port))
            .collect()
    }

    pub fn has_self_rule(&self) -> bool {
        self.rules
            .iter()
            .any(|r| r.source == Peer::SelfReference && r.port == PortSpec::AllTraffic)
    }
}

/// The declared security group and the VPC it lives in
#[derive(Debug, Clone)]
pub struct NetworkFabric {
    pub security_group: String,
    pub vpc: VpcAttributes,
    pub boundary: NetworkBoundary,
}

impl NetworkFabric {
    /// Group id, for properties that take security group ids
    pub fn group_id(&self) -> Expr {
        Expr::attr(&self.security_group, "GroupId")
    }

    pub fn private_subnets(&self) -> Value {
        json!(self.vpc.private_subnet_ids)
    }

    pub fn public_subnets(&self) -> Value {
        json!(self.vpc.public_subnet_ids)
    }
}

/// Declares the security group and its self-ingress rule
pub fn declare(
    graph: &mut ResourceGraph,
    exposure: &Exposure,
    vpc: &VpcAttributes,
) -> Result<NetworkFabric> {
    let boundary = NetworkBoundary::for_exposure(exposure);

    let ingress: Vec<Value> = boundary
        .rules
        .iter()
        .filter_map(IngressRule::to_inline_json)
        .collect();

    let mut group = Resource::new(SECURITY_GROUP_ID, "AWS::EC2::SecurityGroup")
        .with_property("GroupDescription", GROUP_DESCRIPTION)
        .with_property("VpcId", vpc.vpc_id.as_str())
        .with_property("SecurityGroupIngress", ingress)
        .taggable();
    if boundary.allow_all_outbound {
        group.set_property(
            "SecurityGroupEgress",
            json!([{
                "CidrIp": "0.0.0.0/0",
                "IpProtocol": "-1",
                "Description": "Allow all outbound traffic by default",
            }]),
        );
    }
    graph.add(group)?;

    // The self rule lives in its own resource so the group does not reference itself
    let group_id = Expr::attr(SECURITY_GROUP_ID, "GroupId");
    graph.add(
        Resource::new(SELF_INGRESS_ID, "AWS::EC2::SecurityGroupIngress")
            .with_property("GroupId", group_id.clone())
            .with_property("SourceSecurityGroupId", group_id)
            .with_property("IpProtocol", PortSpec::AllTraffic.protocol())
            .with_property("Description", "Self referencing rule"),
    )?;

    tracing::debug!(exposure = %exposure, vpc = %vpc.vpc_id, "Declared network fabric");

    Ok(NetworkFabric {
        security_group: SECURITY_GROUP_ID.to_string(),
        vpc: vpc.clone(),
        boundary,
    })
}
