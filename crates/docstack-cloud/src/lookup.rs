//! Lookup context
//!
//! Values the builder reads but never computes (account number, hosted zone
//! id, secure parameters, VPC attributes) come from a [`LookupSource`]. The
//! file-backed source is a versioned JSON document, `docstack.context.json`,
//! holding the cached results of parameter-store and VPC lookups.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONTEXT_VERSION: u32 = 1;

/// Something that answers parameter-store and network lookups
pub trait LookupSource {
    /// Plain string parameter
    fn string_parameter(&self, name: &str) -> Result<Option<String>>;

    /// Latest version of a secure parameter, if the parameter exists
    fn secure_parameter_version(&self, name: &str) -> Result<Option<u64>>;

    /// Network attributes of a VPC looked up by name
    fn vpc(&self, name: &str) -> Result<Option<VpcAttributes>>;

    /// Plain parameter that must exist
    fn require_parameter(&self, name: &str) -> Result<String> {
        self.string_parameter(name)?
            .ok_or_else(|| CloudError::LookupFailed(format!("parameter {} not found", name)))
    }

    /// Fails unless `version` of the secure parameter `name` exists
    fn require_secure_version(&self, name: &str, version: u64) -> Result<()> {
        match self.secure_parameter_version(name)? {
            Some(latest) if latest >= version && version > 0 => Ok(()),
            _ => Err(CloudError::SecretVersionMissing {
                path: name.to_string(),
                version,
            }),
        }
    }

    fn require_vpc(&self, name: &str) -> Result<VpcAttributes> {
        self.vpc(name)?
            .ok_or_else(|| CloudError::LookupFailed(format!("VPC {} not found", name)))
    }
}

/// A cached parameter-store entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEntry {
    /// Plain value; secure parameters never carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub secure: bool,

    /// Latest version stored
    #[serde(default = "default_version")]
    pub version: u64,
}

fn default_version() -> u64 {
    1
}

impl ParameterEntry {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            secure: false,
            version: 1,
        }
    }

    pub fn secure(version: u64) -> Self {
        Self {
            value: None,
            secure: true,
            version,
        }
    }
}

/// VPC attributes needed to place resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcAttributes {
    pub vpc_id: String,

    /// Subnets with egress but no inbound internet route
    pub private_subnet_ids: Vec<String>,

    /// Subnets routed through an internet gateway
    pub public_subnet_ids: Vec<String>,
}

/// Cached lookups for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupContext {
    /// Context file version
    pub version: u32,

    /// Parameters indexed by name
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterEntry>,

    /// VPCs indexed by name tag
    #[serde(default)]
    pub vpcs: BTreeMap<String, VpcAttributes>,
}

impl Default for LookupContext {
    fn default() -> Self {
        Self {
            version: CONTEXT_VERSION,
            parameters: BTreeMap::new(),
            vpcs: BTreeMap::new(),
        }
    }
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, entry: ParameterEntry) -> Self {
        self.parameters.insert(name.into(), entry);
        self
    }

    pub fn with_vpc(mut self, name: impl Into<String>, vpc: VpcAttributes) -> Self {
        self.vpcs.insert(name.into(), vpc);
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, entry: ParameterEntry) {
        self.parameters.insert(name.into(), entry);
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<ParameterEntry> {
        self.parameters.remove(name)
    }
}

impl LookupSource for LookupContext {
    fn string_parameter(&self, name: &str) -> Result<Option<String>> {
        match self.parameters.get(name) {
            Some(entry) if entry.secure => Err(CloudError::LookupFailed(format!(
                "parameter {} is a secure string and cannot be read as plain text",
                name
            ))),
            Some(entry) => Ok(entry.value.clone()),
            None => Ok(None),
        }
    }

    fn secure_parameter_version(&self, name: &str) -> Result<Option<u64>> {
        Ok(self
            .parameters
            .get(name)
            .filter(|e| e.secure)
            .map(|e| e.version))
    }

    fn vpc(&self, name: &str) -> Result<Option<VpcAttributes>> {
        Ok(self.vpcs.get(name).cloned())
    }
}

/// Reads lookup context files
pub struct ContextManager {
    path: PathBuf,
}

impl ContextManager {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the context. A missing file is an error: every lookup would fail.
    pub fn load(&self) -> Result<LookupContext> {
        if !self.path.exists() {
            return Err(CloudError::ContextError(format!(
                "context file not found: {}",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path)?;
        let context: LookupContext = serde_json::from_str(&content)?;

        if context.version > CONTEXT_VERSION {
            return Err(CloudError::ContextError(format!(
                "Context file version {} is newer than supported version {}",
                context.version, CONTEXT_VERSION
            )));
        }

        tracing::debug!(
            path = %self.path.display(),
            parameters = context.parameters.len(),
            vpcs = context.vpcs.len(),
            "Loaded lookup context"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> LookupContext {
        LookupContext::new()
            .with_parameter("/all/awsAccountNumber", ParameterEntry::plain("123456789012"))
            .with_parameter("/devA/BookStack/DB_PASS", ParameterEntry::secure(2))
            .with_vpc(
                "devAVpc",
                VpcAttributes {
                    vpc_id: "vpc-1".into(),
                    private_subnet_ids: vec!["subnet-a".into()],
                    public_subnet_ids: vec!["subnet-b".into()],
                },
            )
    }

    #[test]
    fn test_required_lookups() {
        let context = sample();
        assert_eq!(
            context.require_parameter("/all/awsAccountNumber").unwrap(),
            "123456789012"
        );
        assert!(context.require_parameter("/all/missing").is_err());
        assert_eq!(context.require_vpc("devAVpc").unwrap().vpc_id, "vpc-1");
        assert!(context.require_vpc("prodVpc").is_err());
    }

    #[test]
    fn test_secure_version_must_exist() {
        let context = sample();
        assert!(context.require_secure_version("/devA/BookStack/DB_PASS", 2).is_ok());
        assert!(context.require_secure_version("/devA/BookStack/DB_PASS", 1).is_ok());

        let err = context
            .require_secure_version("/devA/BookStack/DB_PASS", 3)
            .unwrap_err();
        assert!(matches!(err, CloudError::SecretVersionMissing { version: 3, .. }));

        assert!(context.require_secure_version("/devB/BookStack/DB_PASS", 2).is_err());
    }

    #[test]
    fn test_secure_parameter_not_readable_as_plain() {
        let context = sample();
        assert!(context.string_parameter("/devA/BookStack/DB_PASS").is_err());
    }

    #[test]
    fn test_context_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("docstack.context.json");
        fs::write(&path, serde_json::to_string_pretty(&sample()).unwrap()).unwrap();

        let loaded = ContextManager::new(&path).load().unwrap();
        assert_eq!(loaded.parameters.len(), 2);
        assert!(loaded.parameters["/devA/BookStack/DB_PASS"].secure);
    }

    #[test]
    fn test_context_missing_file() {
        let temp_dir = tempdir().unwrap();
        let manager = ContextManager::new(temp_dir.path().join("nope.json"));
        assert!(matches!(manager.load().unwrap_err(), CloudError::ContextError(_)));
    }

    #[test]
    fn test_context_newer_version_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("docstack.context.json");
        fs::write(&path, r#"{ "version": 99 }"#).unwrap();
        assert!(ContextManager::new(&path).load().is_err());
    }
}
