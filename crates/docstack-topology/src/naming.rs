//! Naming and parameter resolution
//!
//! Every environment-specific name is derived here, once, from the
//! deployment profile.

use docstack_core::{DeploymentProfile, StackDefinition, Tier};
use serde::Serialize;

/// Names derived from one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNames {
    /// Stack identifier, `{environment}{project}`
    pub stack_id: String,
    pub hostname: String,
    pub full_url: String,
    pub database_username: String,
    pub database_name: String,
    /// Secure parameter holding the database password
    pub secret_parameter_path: String,
    pub cluster_name: String,
    /// Name tag of the VPC to deploy into
    pub vpc_name: String,
}

/// Derives every environment-specific name
pub fn resolve(definition: &StackDefinition, profile: &DeploymentProfile) -> ResolvedNames {
    let environment = profile.environment.as_str();
    let stack_id = format!("{}{}", environment, definition.project);

    let hostname = match profile.tier {
        Tier::Production => definition.domain.clone(),
        Tier::NonProduction => format!("{}-{}", environment, definition.domain),
    };

    ResolvedNames {
        full_url: format!("https://{}", hostname),
        hostname,
        database_username: format!("{}RdsAdmin", stack_id),
        database_name: format!("{}Rds", stack_id),
        secret_parameter_path: format!("/{}/{}/DB_PASS", environment, definition.project),
        cluster_name: format!("{}-Cluster", stack_id),
        vpc_name: format!("{}Vpc", environment),
        stack_id,
    }
}

/// Parameter holding the account number
pub const ACCOUNT_NUMBER_PARAMETER: &str = "/all/awsAccountNumber";

/// Parameter holding the hosted zone id of `zone`
pub fn hosted_zone_parameter(zone: &str) -> String {
    format!("/all/aws/route53/{}/hostedZoneId", zone)
}
