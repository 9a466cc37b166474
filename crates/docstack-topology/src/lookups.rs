//! External lookups
//!
//! Everything the topology reads from outside (account number, hosted zone
//! id, the database password parameter, the VPC) is resolved here in one
//! pass, before any resource is declared.

use crate::error::{Result, TopologyError};
use crate::naming::{self, ResolvedNames};
use docstack_cloud::{LookupSource, VpcAttributes};
use docstack_core::StackDefinition;
use serde::Serialize;

/// Values read from the lookup source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLookups {
    pub account_number: String,
    pub hosted_zone_id: String,
    pub vpc: VpcAttributes,
}

/// Resolves every lookup the topology needs, failing on the first gap
pub fn resolve(
    source: &dyn LookupSource,
    definition: &StackDefinition,
    names: &ResolvedNames,
) -> Result<ResolvedLookups> {
    let account_number = source.require_parameter(naming::ACCOUNT_NUMBER_PARAMETER)?;
    let hosted_zone_id = source.require_parameter(&naming::hosted_zone_parameter(&definition.zone))?;

    source.require_secure_version(&names.secret_parameter_path, definition.secret_version)?;

    let vpc = source.require_vpc(&names.vpc_name)?;
    if vpc.private_subnet_ids.is_empty() {
        return Err(TopologyError::NoSubnets {
            vpc: names.vpc_name.clone(),
            kind: "private",
        });
    }
    if vpc.public_subnet_ids.is_empty() {
        return Err(TopologyError::NoSubnets {
            vpc: names.vpc_name.clone(),
            kind: "public",
        });
    }

    tracing::debug!(
        vpc = %vpc.vpc_id,
        private_subnets = vpc.private_subnet_ids.len(),
        public_subnets = vpc.public_subnet_ids.len(),
        "Resolved lookups"
    );

    Ok(ResolvedLookups {
        account_number,
        hosted_zone_id,
        vpc,
    })
}

/// Kind of a required lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LookupKind {
    Parameter,
    SecureParameter { version: u64 },
    Vpc,
}

/// One lookup an environment needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredLookup {
    pub key: String,
    #[serde(flatten)]
    pub kind: LookupKind,
}

impl RequiredLookup {
    /// Whether `source` answers this lookup
    pub fn is_satisfied(&self, source: &dyn LookupSource) -> bool {
        match self.kind {
            LookupKind::Parameter => matches!(source.string_parameter(&self.key), Ok(Some(_))),
            LookupKind::SecureParameter { version } => {
                source.require_secure_version(&self.key, version).is_ok()
            }
            LookupKind::Vpc => matches!(source.vpc(&self.key), Ok(Some(_))),
        }
    }
}

/// Lookups one environment needs, in resolution order
pub fn required_lookups(definition: &StackDefinition, names: &ResolvedNames) -> Vec<RequiredLookup> {
    vec![
        RequiredLookup {
            key: naming::ACCOUNT_NUMBER_PARAMETER.to_string(),
            kind: LookupKind::Parameter,
        },
        RequiredLookup {
            key: naming::hosted_zone_parameter(&definition.zone),
            kind: LookupKind::Parameter,
        },
        RequiredLookup {
            key: names.secret_parameter_path.clone(),
            kind: LookupKind::SecureParameter {
                version: definition.secret_version,
            },
        },
        RequiredLookup {
            key: names.vpc_name.clone(),
            kind: LookupKind::Vpc,
        },
    ]
}
