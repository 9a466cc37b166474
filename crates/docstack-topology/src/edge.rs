//! Edge router
//!
//! Internet-facing load balancer. Port 80 only redirects to HTTPS; port 443
//! terminates TLS and forwards to the service's target group.

use crate::compute::TaskDefinition;
use crate::error::{Result, TopologyError};
use crate::lookups::ResolvedLookups;
use crate::naming::ResolvedNames;
use crate::network::NetworkFabric;
use crate::service::ServiceRunner;
use docstack_cloud::{CloudError, Deferred, Expr, Output, Resource, ResourceGraph};
use docstack_core::{DeploymentProfile, HealthCheckPolicy};
use serde_json::{Value, json};

pub const LOAD_BALANCER_ID: &str = "Alb";
pub const CERTIFICATE_ID: &str = "AlbCert";
pub const TARGET_GROUP_ID: &str = "EcsTargetGroup";
pub const HTTP_LISTENER_ID: &str = "HttpListener";
pub const HTTPS_LISTENER_ID: &str = "HttpsListener";
pub const DNS_OUTPUT: &str = "LoadBalancerDNS";

const HEALTH_CHECK_GRACE_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    Redirect {
        protocol: Protocol,
        port: u16,
        permanent: bool,
    },
    Forward {
        target_group: String,
    },
}

impl ListenerAction {
    fn to_json(&self) -> Value {
        match self {
            ListenerAction::Redirect {
                protocol,
                port,
                permanent,
            } => json!({
                "Type": "redirect",
                "RedirectConfig": {
                    "Protocol": protocol.as_str(),
                    "Port": port.to_string(),
                    "StatusCode": if *permanent { "HTTP_301" } else { "HTTP_302" },
                }
            }),
            ListenerAction::Forward { target_group } => json!({
                "Type": "forward",
                "TargetGroupArn": Value::from(Expr::reference(target_group)),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub logical_id: String,
    pub port: u16,
    pub protocol: Protocol,
    pub actions: Vec<ListenerAction>,
}

/// Target group the service registers in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub logical_id: String,
    pub port: u16,
    pub health_check: HealthCheckPolicy,
}

/// The declared load balancer and everything hanging off it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRouter {
    pub load_balancer: String,
    pub certificate: String,
    pub internet_facing: bool,
    pub target_group: TargetGroup,
    pub listeners: Vec<Listener>,
    pub dns_name: Deferred,
    pub canonical_zone_id: Deferred,
}

impl EdgeRouter {
    pub fn listener(&self, port: u16) -> Option<&Listener> {
        self.listeners.iter().find(|l| l.port == port)
    }
}

/// Declares the load balancer, certificate, target group and listeners, and
/// registers the service in the target group
pub fn declare(
    graph: &mut ResourceGraph,
    names: &ResolvedNames,
    profile: &DeploymentProfile,
    lookups: &ResolvedLookups,
    fabric: &NetworkFabric,
    task: &TaskDefinition,
    service: &ServiceRunner,
) -> Result<EdgeRouter> {
    let container_port = task.container_port().unwrap_or_default();
    if container_port != profile.container_port {
        return Err(TopologyError::PortMismatch {
            container: container_port,
            target: profile.container_port,
        });
    }

    graph.add(
        Resource::new(CERTIFICATE_ID, "AWS::CertificateManager::Certificate")
            .with_property("DomainName", names.hostname.as_str())
            .with_property("ValidationMethod", "DNS")
            .with_property(
                "DomainValidationOptions",
                json!([{
                    "DomainName": names.hostname,
                    "HostedZoneId": lookups.hosted_zone_id,
                }]),
            )
            .taggable(),
    )?;

    graph.add(
        Resource::new(LOAD_BALANCER_ID, "AWS::ElasticLoadBalancingV2::LoadBalancer")
            .with_property("Type", "application")
            .with_property("Scheme", "internet-facing")
            .with_property("Subnets", fabric.public_subnets())
            .with_property("SecurityGroups", vec![fabric.group_id()])
            .with_property(
                "LoadBalancerAttributes",
                json!([{ "Key": "deletion_protection.enabled", "Value": "false" }]),
            )
            .taggable(),
    )?;

    let health = &profile.health_check;
    graph.add(
        Resource::new(TARGET_GROUP_ID, "AWS::ElasticLoadBalancingV2::TargetGroup")
            .with_property("Port", profile.container_port)
            .with_property("Protocol", Protocol::Http.as_str())
            .with_property("TargetType", "ip")
            .with_property("VpcId", fabric.vpc.vpc_id.as_str())
            .with_property("HealthCheckPath", health.path.as_str())
            .with_property("HealthCheckIntervalSeconds", health.interval_secs)
            .with_property("HealthCheckTimeoutSeconds", health.timeout_secs)
            .with_property("Matcher", json!({ "HttpCode": health.matcher() }))
            .taggable(),
    )?;

    let listeners = vec![
        Listener {
            logical_id: HTTP_LISTENER_ID.to_string(),
            port: 80,
            protocol: Protocol::Http,
            actions: vec![ListenerAction::Redirect {
                protocol: Protocol::Https,
                port: 443,
                permanent: true,
            }],
        },
        Listener {
            logical_id: HTTPS_LISTENER_ID.to_string(),
            port: 443,
            protocol: Protocol::Https,
            actions: vec![ListenerAction::Forward {
                target_group: TARGET_GROUP_ID.to_string(),
            }],
        },
    ];

    for listener in &listeners {
        let actions: Vec<Value> = listener.actions.iter().map(ListenerAction::to_json).collect();
        let mut resource = Resource::new(&listener.logical_id, "AWS::ElasticLoadBalancingV2::Listener")
            .with_property("LoadBalancerArn", Expr::reference(LOAD_BALANCER_ID))
            .with_property("Port", listener.port)
            .with_property("Protocol", listener.protocol.as_str())
            .with_property("DefaultActions", actions);
        if listener.protocol == Protocol::Https {
            resource.set_property(
                "Certificates",
                json!([{ "CertificateArn": Value::from(Expr::reference(CERTIFICATE_ID)) }]),
            );
        }
        graph.add(resource)?;
    }

    let container_name = task.primary().name.clone();
    let service_resource = graph
        .get_mut(&service.service)
        .ok_or_else(|| CloudError::ResourceNotFound(service.service.clone()))?;
    service_resource.set_property(
        "LoadBalancers",
        json!([{
            "ContainerName": container_name,
            "ContainerPort": container_port,
            "TargetGroupArn": Value::from(Expr::reference(TARGET_GROUP_ID)),
        }]),
    );
    service_resource.set_property("HealthCheckGracePeriodSeconds", HEALTH_CHECK_GRACE_SECS);
    graph.add_dependency(&service.service, HTTPS_LISTENER_ID)?;

    let dns_name = Deferred::new(LOAD_BALANCER_ID, "DNSName");
    graph.add_output(
        Output::new(DNS_OUTPUT, dns_name.to_json()).with_description("Load balancer DNS name"),
    )?;

    tracing::debug!(
        hostname = %names.hostname,
        target_port = profile.container_port,
        health_path = %health.path,
        "Declared edge router"
    );

    Ok(EdgeRouter {
        load_balancer: LOAD_BALANCER_ID.to_string(),
        certificate: CERTIFICATE_ID.to_string(),
        internet_facing: true,
        target_group: TargetGroup {
            logical_id: TARGET_GROUP_ID.to_string(),
            port: profile.container_port,
            health_check: health.clone(),
        },
        listeners,
        dns_name,
        canonical_zone_id: Deferred::new(LOAD_BALANCER_ID, "CanonicalHostedZoneID"),
    })
}
