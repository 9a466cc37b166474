//! End-to-end topology tests

use docstack_cloud::{CloudError, LookupContext, ParameterEntry, VpcAttributes};
use docstack_core::{StackDefinition, parse_stack_string};
use docstack_topology::{
    EnvValue, ListenerAction, Peer, PortSpec, Protocol, TopologyBuilder, TopologyError,
};
use serde_json::json;

const STACK: &str = r#"
project "BookStack"
domain "docs.wmaug.org"
zone "wmaug.org"
image "lscr.io/linuxserver/bookstack:latest"

environment "devA" {
    exposure "public"
    container-port 80
    health-check path="/login" interval=10 timeout=3 codes="200,302"
    log-router #true
}

environment "productionA" {
    exposure "restricted" cidr="203.0.113.10/32"
    container-port 6875
    health-check path="/" codes="200"
}
"#;

fn definition() -> StackDefinition {
    parse_stack_string(STACK).unwrap()
}

fn vpc(prefix: &str) -> VpcAttributes {
    VpcAttributes {
        vpc_id: format!("vpc-{}", prefix),
        private_subnet_ids: vec![format!("subnet-{}-p1", prefix), format!("subnet-{}-p2", prefix)],
        public_subnet_ids: vec![format!("subnet-{}-u1", prefix), format!("subnet-{}-u2", prefix)],
    }
}

fn context() -> LookupContext {
    LookupContext::new()
        .with_parameter("/all/awsAccountNumber", ParameterEntry::plain("123456789012"))
        .with_parameter(
            "/all/aws/route53/wmaug.org/hostedZoneId",
            ParameterEntry::plain("Z0123456789"),
        )
        .with_parameter("/devA/BookStack/DB_PASS", ParameterEntry::secure(2))
        .with_parameter("/productionA/BookStack/DB_PASS", ParameterEntry::secure(3))
        .with_vpc("devAVpc", vpc("dev"))
        .with_vpc("productionAVpc", vpc("prod"))
}

#[test]
fn test_dev_scenario_names() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();

    assert_eq!(topology.stack_id, "devABookStack");
    assert_eq!(topology.names.hostname, "devA-docs.wmaug.org");
    assert_eq!(topology.names.full_url, "https://devA-docs.wmaug.org");
    assert_eq!(topology.names.secret_parameter_path, "/devA/BookStack/DB_PASS");
    assert_eq!(topology.names.database_name, "devABookStackRds");
    assert_eq!(topology.dns.record_name, "devA-docs.wmaug.org.");
    assert_eq!(topology.dns.zone_id, "Z0123456789");
}

#[test]
fn test_production_uses_bare_domain() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("productionA", &context()).unwrap();

    assert!(topology.profile.is_production());
    assert_eq!(topology.names.hostname, "docs.wmaug.org");
    assert_eq!(
        topology.task.primary().env("APP_URL").and_then(EnvValue::as_literal),
        Some("https://docs.wmaug.org")
    );
    let cert = topology.graph.get("AlbCert").unwrap();
    assert_eq!(cert.property("DomainName"), Some(&json!("docs.wmaug.org")));
}

#[test]
fn test_boundary_rules_follow_exposure() {
    let def = definition();
    let builder = TopologyBuilder::new(&def);

    for (env, source) in [("devA", "0.0.0.0/0"), ("productionA", "203.0.113.10/32")] {
        let topology = builder.build(env, &context()).unwrap();
        let boundary = &topology.network.boundary;

        assert_eq!(boundary.rules.len(), 3);
        assert!(boundary.has_self_rule());
        assert!(boundary.allow_all_outbound);
        for port in [80, 443] {
            let rules = boundary.rules_for_port(port);
            assert_eq!(rules.len(), 1, "{env}: port {port}");
            assert_eq!(rules[0].source, Peer::Cidr(source.to_string()));
        }
        assert!(
            boundary
                .rules
                .iter()
                .filter(|r| r.source == Peer::SelfReference)
                .all(|r| r.port == PortSpec::AllTraffic)
        );
    }
}

#[test]
fn test_password_only_reachable_through_secrets() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();
    let primary = topology.task.primary();

    assert!(primary.env("DB_PASS").is_none());
    assert!(primary.secret("DB_PASS").is_some());

    let containers = topology
        .graph
        .get("TaskDefinition")
        .unwrap()
        .property("ContainerDefinitions")
        .unwrap()
        .clone();
    let environment = containers[0]["Environment"].as_array().unwrap();
    assert!(environment.iter().all(|e| e["Name"] != json!("DB_PASS")));
    assert_eq!(containers[0]["Secrets"][0]["Name"], json!("DB_PASS"));
}

#[test]
fn test_database_endpoint_is_deferred() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();

    let db_host = topology.task.primary().env("DB_HOST").unwrap();
    assert!(db_host.as_literal().is_none());
    assert_eq!(
        topology.task.primary().env("DB_PORT").and_then(EnvValue::as_literal),
        Some("3306")
    );
    assert_eq!(
        topology.graph.output("RdsEndpoint").unwrap().value,
        json!({ "Fn::GetAtt": ["BookStackRds", "Endpoint.Address"] })
    );
}

#[test]
fn test_service_waits_for_storage_and_database() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();
    let service = topology.graph.get("BookStackService").unwrap();

    assert!(service.depends_on.contains("BookStackEfs"));
    assert!(service.depends_on.contains("BookStackEfsMountTarget1"));
    assert!(service.depends_on.contains("BookStackEfsMountTarget2"));
    assert!(service.depends_on.contains("BookStackRds"));
    assert!(service.depends_on.contains("HttpsListener"));

    let plan = topology.plan().unwrap();
    let service_wave = plan.step("BookStackService").unwrap().wave;
    for dep in ["BookStackEfs", "BookStackEfsMountTarget1", "BookStackRds"] {
        assert!(plan.step(dep).unwrap().wave < service_wave);
    }
    assert!(plan.step("ARecord").unwrap().wave > plan.step("Alb").unwrap().wave);
}

#[test]
fn test_http_listener_only_redirects() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();

    let http = topology.edge.listener(80).unwrap();
    assert_eq!(
        http.actions,
        vec![ListenerAction::Redirect {
            protocol: Protocol::Https,
            port: 443,
            permanent: true,
        }]
    );

    let rendered = topology.graph.get("HttpListener").unwrap();
    let actions = rendered.property("DefaultActions").unwrap().as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["RedirectConfig"]["StatusCode"], json!("HTTP_301"));

    let https = topology.edge.listener(443).unwrap();
    assert!(matches!(https.actions[0], ListenerAction::Forward { .. }));
}

#[test]
fn test_load_balancer_faces_internet_from_public_subnets() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("productionA", &context()).unwrap();

    assert!(topology.edge.internet_facing);
    let alb = topology.graph.get("Alb").unwrap();
    assert_eq!(alb.property("Scheme"), Some(&json!("internet-facing")));
    assert_eq!(
        alb.property("Subnets"),
        Some(&json!(["subnet-prod-u1", "subnet-prod-u2"]))
    );
}

#[test]
fn test_template_asserts_deployment_region() {
    let def = parse_stack_string(&format!("region \"eu-west-1\"\n{}", STACK)).unwrap();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();
    assert_eq!(topology.region, "eu-west-1");

    let template = topology.template().unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&template.to_json_string().unwrap()).unwrap();
    assert_eq!(
        json["Rules"]["DeploymentRegion"]["Assertions"][0]["Assert"],
        json!({ "Fn::Equals": [{ "Ref": "AWS::Region" }, "eu-west-1"] })
    );
    assert!(json["Description"].as_str().unwrap().contains("eu-west-1"));
}

#[test]
fn test_health_check_and_port_per_environment() {
    let def = definition();
    let builder = TopologyBuilder::new(&def);

    let dev = builder.build("devA", &context()).unwrap();
    let tg = dev.graph.get("EcsTargetGroup").unwrap();
    assert_eq!(tg.property("Port"), Some(&json!(80)));
    assert_eq!(tg.property("HealthCheckPath"), Some(&json!("/login")));
    assert_eq!(tg.property("Matcher"), Some(&json!({ "HttpCode": "200,302" })));

    let prod = builder.build("productionA", &context()).unwrap();
    let tg = prod.graph.get("EcsTargetGroup").unwrap();
    assert_eq!(tg.property("Port"), Some(&json!(6875)));
    assert_eq!(tg.property("Matcher"), Some(&json!({ "HttpCode": "200" })));
    assert_eq!(prod.task.container_port(), Some(6875));
    assert!(prod.task.sidecar().is_none());
}

#[test]
fn test_missing_secret_version_aborts() {
    let def = definition();
    let mut ctx = context();
    ctx.set_parameter("/devA/BookStack/DB_PASS", ParameterEntry::secure(1));

    let err = TopologyBuilder::new(&def).build("devA", &ctx).unwrap_err();
    assert!(matches!(
        err,
        TopologyError::Cloud(CloudError::SecretVersionMissing { ref path, version: 2 })
            if path == "/devA/BookStack/DB_PASS"
    ));
}

#[test]
fn test_hostname_outside_zone_aborts() {
    let def = parse_stack_string(&STACK.replace("zone \"wmaug.org\"", "zone \"example.org\""))
        .unwrap();
    let ctx = context().with_parameter(
        "/all/aws/route53/example.org/hostedZoneId",
        ParameterEntry::plain("Z999"),
    );

    let err = TopologyBuilder::new(&def).build("devA", &ctx).unwrap_err();
    assert!(matches!(err, TopologyError::HostnameOutsideZone { .. }));
}

#[test]
fn test_template_outputs_and_tags() {
    let def = definition();
    let topology = TopologyBuilder::new(&def).build("devA", &context()).unwrap();
    let template = topology.template().unwrap();

    for output in ["RdsEndpoint", "LoadBalancerDNS", "EcsClusterId"] {
        assert!(template.outputs.contains_key(output), "missing output {output}");
    }

    let cluster = template.resource("Cluster").unwrap();
    let tags = cluster.properties["Tags"].as_array().unwrap();
    assert!(tags.contains(&json!({ "Key": "Service", "Value": "BookStack" })));
    assert!(tags.contains(&json!({ "Key": "Environment", "Value": "devA" })));

    let efs = template.resource("BookStackEfs").unwrap();
    assert!(efs.properties.contains_key("FileSystemTags"));

    let rds = template.resource("BookStackRds").unwrap();
    assert_eq!(rds.deletion_policy, Some(docstack_cloud::DeletionPolicy::Delete));
}

#[test]
fn test_build_all_is_independent_per_environment() {
    let def = definition();
    let topologies = TopologyBuilder::new(&def).build_all(&context()).unwrap();

    assert_eq!(topologies.len(), 2);
    assert_eq!(topologies[0].stack_id, "devABookStack");
    assert_eq!(topologies[1].stack_id, "productionABookStack");
    assert_eq!(topologies[0].network.vpc.vpc_id, "vpc-dev");
    assert_eq!(topologies[1].network.vpc.vpc_id, "vpc-prod");
}
