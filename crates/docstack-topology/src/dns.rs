//! DNS binder

use crate::edge::EdgeRouter;
use crate::error::{Result, TopologyError};
use crate::lookups::ResolvedLookups;
use crate::naming::ResolvedNames;
use docstack_cloud::{Deferred, Resource, ResourceGraph};
use serde_json::json;

pub const RECORD_ID: &str = "ARecord";

/// Alias record pointing the hostname at the load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub logical_id: String,
    pub zone_id: String,
    /// Fully qualified, with the trailing dot
    pub record_name: String,
    pub alias_target: Deferred,
}

/// Fails unless `hostname` is `zone` itself or a name below it
pub fn check_zone(hostname: &str, zone: &str) -> Result<()> {
    let host = hostname.trim_end_matches('.').to_ascii_lowercase();
    let zone_name = zone.trim_end_matches('.').to_ascii_lowercase();
    if host == zone_name || host.ends_with(&format!(".{}", zone_name)) {
        Ok(())
    } else {
        Err(TopologyError::HostnameOutsideZone {
            hostname: hostname.to_string(),
            zone: zone.to_string(),
        })
    }
}

pub fn declare(
    graph: &mut ResourceGraph,
    names: &ResolvedNames,
    lookups: &ResolvedLookups,
    edge: &EdgeRouter,
) -> Result<DnsRecord> {
    let record_name = format!("{}.", names.hostname);
    graph.add(
        Resource::new(RECORD_ID, "AWS::Route53::RecordSet")
            .with_property("Name", record_name.as_str())
            .with_property("Type", "A")
            .with_property("HostedZoneId", lookups.hosted_zone_id.as_str())
            .with_property(
                "AliasTarget",
                json!({
                    "DNSName": edge.dns_name.to_json(),
                    "HostedZoneId": edge.canonical_zone_id.to_json(),
                }),
            ),
    )?;

    tracing::debug!(record = %record_name, zone = %lookups.hosted_zone_id, "Declared DNS record");

    Ok(DnsRecord {
        logical_id: RECORD_ID.to_string(),
        zone_id: lookups.hosted_zone_id.clone(),
        record_name,
        alias_target: edge.dns_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_inside_zone() {
        check_zone("devA-docs.wmaug.org", "wmaug.org").unwrap();
        check_zone("docs.wmaug.org.", "wmaug.org").unwrap();
        check_zone("wmaug.org", "wmaug.org").unwrap();
    }

    #[test]
    fn test_hostname_outside_zone() {
        assert!(check_zone("docs.example.org", "wmaug.org").is_err());
        // Suffix match must respect label boundaries
        assert!(check_zone("docs.notwmaug.org", "wmaug.org").is_err());
    }
}
