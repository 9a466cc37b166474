//! Topology builder error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error(transparent)]
    Cloud(#[from] docstack_cloud::CloudError),

    #[error(transparent)]
    Stack(#[from] docstack_core::StackError),

    #[error("Hostname {hostname} is not inside hosted zone {zone}")]
    HostnameOutsideZone { hostname: String, zone: String },

    #[error("VPC {vpc} has no {kind} subnets")]
    NoSubnets { vpc: String, kind: &'static str },

    #[error("Container port {container} does not match target group port {target}")]
    PortMismatch { container: u16, target: u16 },

    #[error("'{0}' is declared both as a plain environment variable and as a secret")]
    EnvironmentSecretConflict(String),

    #[error("Mount point {path} references unknown volume {volume}")]
    UnknownVolume { path: String, volume: String },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
