//! `environment` ノードのパース

use super::{first_integer, first_string, prop, prop_string, prop_u32};
use crate::error::{Result, StackError};
use crate::model::{Environment, EnvironmentSpec, Exposure, HealthCheckPolicy};
use kdl::KdlNode;

/// `environment` ノードをパース
///
/// exposure、container-port、health-check にデフォルトはなく、省略はエラー
pub fn parse_environment(node: &KdlNode) -> Result<(String, EnvironmentSpec)> {
    let name = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("environment requires a name".to_string()))?;
    Environment::parse(name.as_str())?;

    let mut exposure: Option<Exposure> = None;
    let mut container_port: Option<u16> = None;
    let mut health_check: Option<HealthCheckPolicy> = None;
    let mut log_router = false;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "exposure" => exposure = Some(parse_exposure(&name, child)?),
                "container-port" | "container_port" => {
                    let port = first_integer(child)
                        .and_then(|v| u16::try_from(v).ok())
                        .filter(|p| *p > 0)
                        .ok_or_else(|| {
                            StackError::InvalidConfig(format!(
                                "environment '{}': container-port must be 1-65535",
                                name
                            ))
                        })?;
                    container_port = Some(port);
                }
                "health-check" | "health_check" | "healthcheck" => {
                    health_check = Some(parse_health_check(&name, child)?);
                }
                "log-router" | "log_router" => {
                    // 値なしのノードはサイドカー有効
                    log_router = match child.entries().iter().find(|e| e.name().is_none()) {
                        None => true,
                        Some(entry) => entry.value().as_bool().ok_or_else(|| {
                            StackError::InvalidConfig(format!(
                                "environment '{}': log-router must be #true or #false",
                                name
                            ))
                        })?,
                    };
                }
                other => {
                    tracing::debug!(environment = %name, node = other, "Skipping unknown node");
                }
            }
        }
    }

    let missing = |setting: &'static str| StackError::MissingEnvironmentSetting {
        environment: name.clone(),
        setting,
    };

    let spec = EnvironmentSpec {
        exposure: exposure.ok_or_else(|| missing("exposure"))?,
        container_port: container_port.ok_or_else(|| missing("container-port"))?,
        health_check: health_check.ok_or_else(|| missing("health-check"))?,
        log_router,
    };

    Ok((name, spec))
}

fn parse_exposure(environment: &str, node: &KdlNode) -> Result<Exposure> {
    match first_string(node).as_deref() {
        Some("public") => Ok(Exposure::Public),
        Some("restricted") => {
            let cidr = prop_string(node, "cidr").ok_or_else(|| {
                StackError::InvalidConfig(format!(
                    "environment '{}': restricted exposure requires cidr=\"x.x.x.x/32\"",
                    environment
                ))
            })?;
            Exposure::restricted(cidr)
        }
        other => Err(StackError::InvalidConfig(format!(
            "environment '{}': exposure must be \"public\" or \"restricted\", got {:?}",
            environment, other
        ))),
    }
}

fn parse_health_check(environment: &str, node: &KdlNode) -> Result<HealthCheckPolicy> {
    let required = |key: &str| {
        StackError::InvalidConfig(format!(
            "environment '{}': health-check requires {}",
            environment, key
        ))
    };

    let path = prop_string(node, "path").ok_or_else(|| required("path"))?;
    let codes = match prop(node, "codes") {
        Some(value) => match (value.as_string(), value.as_integer()) {
            (Some(s), _) => HealthCheckPolicy::parse_codes(s)?,
            (None, Some(code)) => vec![u16::try_from(code).map_err(|_| required("codes"))?],
            _ => return Err(required("codes")),
        },
        None => return Err(required("codes")),
    };
    let interval = prop_u32(node, "interval")?.unwrap_or(10);
    let timeout = prop_u32(node, "timeout")?.unwrap_or(3);

    HealthCheckPolicy::new(path, interval, timeout, codes)
}
