//! KDLパーサー
//!
//! docstack のスタック定義をパースする。environment ブロックは別モジュール。

mod environment;

use environment::parse_environment;

use crate::error::{Result, StackError};
use crate::model::{
    DEFAULT_LOG_ROUTER_IMAGE, DEFAULT_PRODUCTION, DEFAULT_PROJECT, DEFAULT_REGION,
    DEFAULT_SECRET_VERSION, DatabaseSettings, StackDefinition, TaskSize,
};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// スタック定義ファイルをパース
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackDefinition> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| StackError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    parse_stack_string(&content)
}

/// 文字列からスタック定義をパース
pub fn parse_stack_string(content: &str) -> Result<StackDefinition> {
    let doc: KdlDocument = content.parse()?;

    let mut project: Option<String> = None;
    let mut domain: Option<String> = None;
    let mut zone: Option<String> = None;
    let mut region: Option<String> = None;
    let mut production: Option<String> = None;
    let mut image: Option<String> = None;
    let mut log_router_image: Option<String> = None;
    let mut secret_version = DEFAULT_SECRET_VERSION;
    let mut task = TaskSize::default();
    let mut database = DatabaseSettings::default();
    let mut environments = BTreeMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => project = first_string(node),
            "domain" => domain = first_string(node),
            "zone" => zone = first_string(node),
            "region" => region = first_string(node),
            "production" => production = first_string(node),
            "image" => image = first_string(node),
            "log-router-image" | "log_router_image" => log_router_image = first_string(node),
            "secret-version" | "secret_version" => {
                secret_version = first_integer(node)
                    .and_then(|v| u64::try_from(v).ok())
                    .filter(|v| *v > 0)
                    .ok_or_else(|| {
                        StackError::InvalidConfig(
                            "secret-version must be a positive integer".to_string(),
                        )
                    })?;
            }
            "task" => task = parse_task(node)?,
            "database" => database = parse_database(node)?,
            "environment" => {
                let (name, spec) = parse_environment(node)?;
                if environments.contains_key(&name) {
                    return Err(StackError::DuplicateEnvironment(name));
                }
                environments.insert(name, spec);
            }
            other => {
                tracing::debug!(node = other, "Skipping unknown node");
            }
        }
    }

    let definition = StackDefinition {
        project: project.unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        domain: domain.ok_or(StackError::MissingSetting("domain"))?,
        zone: zone.ok_or(StackError::MissingSetting("zone"))?,
        region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        production: production.unwrap_or_else(|| DEFAULT_PRODUCTION.to_string()),
        image: image.ok_or(StackError::MissingSetting("image"))?,
        log_router_image: log_router_image.unwrap_or_else(|| DEFAULT_LOG_ROUTER_IMAGE.to_string()),
        secret_version,
        task,
        database,
        environments,
    };

    if !is_alphanumeric_name(&definition.project) {
        return Err(StackError::InvalidConfig(format!(
            "project must be alphanumeric and start with a letter: {}",
            definition.project
        )));
    }

    Ok(definition)
}

fn parse_task(node: &KdlNode) -> Result<TaskSize> {
    let mut task = TaskSize::default();
    if let Some(cpu) = prop_u32(node, "cpu")? {
        task.cpu = cpu;
    }
    if let Some(memory) = prop_u32(node, "memory")? {
        task.memory_mib = memory;
    }
    // Fargate は決まった cpu サイズのみ受け付ける
    if ![256, 512, 1024, 2048, 4096].contains(&task.cpu) {
        return Err(StackError::InvalidConfig(format!(
            "task cpu must be one of 256, 512, 1024, 2048, 4096: {}",
            task.cpu
        )));
    }
    if task.memory_mib < 512 {
        return Err(StackError::InvalidConfig(format!(
            "task memory must be at least 512 MiB: {}",
            task.memory_mib
        )));
    }
    Ok(task)
}

fn parse_database(node: &KdlNode) -> Result<DatabaseSettings> {
    let mut database = DatabaseSettings::default();
    if let Some(class) = prop_string(node, "instance-class") {
        database.instance_class = class;
    }
    if let Some(version) = prop_string(node, "engine-version") {
        database.engine_version = version;
    }
    if let Some(storage) = prop_u32(node, "storage")? {
        if storage < 20 {
            return Err(StackError::InvalidConfig(format!(
                "database storage must be at least 20 GiB: {}",
                storage
            )));
        }
        database.allocated_storage_gib = storage;
    }
    if let Some(days) = prop_u32(node, "backup-days")? {
        database.backup_retention_days = days;
    }
    Ok(database)
}

pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

pub(crate) fn first_integer(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

pub(crate) fn prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .map(|e| e.value())
}

pub(crate) fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    prop(node, key)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub(crate) fn prop_u32(node: &KdlNode, key: &str) -> Result<Option<u32>> {
    match prop(node, key) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                StackError::InvalidConfig(format!(
                    "{} on '{}' must be a non-negative integer",
                    key,
                    node.name().value()
                ))
            }),
    }
}

fn is_alphanumeric_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}
