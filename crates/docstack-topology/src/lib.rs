//! docstack topology
//!
//! Builds the resource graph of one BookStack deployment environment.
//!
//! Components, in dependency order:
//!
//! - [`naming`]: hostnames, stack id, database and parameter names
//! - [`secret`]: credential record and the secure parameter ARN
//! - [`network`]: the shared security group
//! - [`compute`]: task roles, containers, environment and secrets
//! - [`storage`]: encrypted file system mounted at `/config`
//! - [`database`]: MySQL instance and its deferred endpoint
//! - [`service`]: cluster and Fargate service
//! - [`edge`]: load balancer, certificate, listeners and target group
//! - [`dns`]: alias record in the hosted zone
//!
//! [`TopologyBuilder`] runs them in that order after resolving lookups.

pub mod builder;
pub mod compute;
pub mod database;
pub mod dns;
pub mod edge;
pub mod error;
pub mod lookups;
pub mod naming;
pub mod network;
pub mod secret;
pub mod service;
pub mod storage;

#[cfg(test)]
mod testing;

pub use builder::{StackTopology, TopologyBuilder};
pub use compute::{
    ContainerDefinition, EnvValue, MountPoint, SecretSource, TaskDefinition, TaskDefinitionBuilder,
    VolumeSpec,
};
pub use database::DataStoreInstance;
pub use dns::DnsRecord;
pub use edge::{EdgeRouter, Listener, ListenerAction, Protocol, TargetGroup};
pub use error::{Result, TopologyError};
pub use lookups::{LookupKind, RequiredLookup, ResolvedLookups, required_lookups};
pub use naming::ResolvedNames;
pub use network::{IngressRule, NetworkBoundary, NetworkFabric, Peer, PortSpec};
pub use secret::CredentialSecret;
pub use service::ServiceRunner;
pub use storage::PersistentVolume;
