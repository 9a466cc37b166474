//! Resource declarations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// What the engine does with a resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// A single declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Template-unique identifier
    pub logical_id: String,

    /// Engine resource type (e.g., "AWS::ECS::Service")
    pub resource_type: String,

    /// Resource-specific properties
    pub properties: Map<String, Value>,

    /// Explicit creation-order edges the engine cannot infer from references
    pub depends_on: BTreeSet<String>,

    pub deletion_policy: Option<DeletionPolicy>,

    /// Property that carries stack tags, if the type is taggable
    pub tag_property: Option<String>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            tag_property: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Get a property value as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Marks the type as taggable through the standard `Tags` property
    pub fn taggable(self) -> Self {
        self.tagged_via("Tags")
    }

    pub fn tagged_via(mut self, property: impl Into<String>) -> Self {
        self.tag_property = Some(property.into());
        self
    }

    /// Resources read by this resource's properties
    pub fn references(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for value in self.properties.values() {
            collect_references(value, &mut found);
        }
        found
    }

    /// Explicit and implicit dependencies together
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut all = self.references();
        all.extend(self.depends_on.iter().cloned());
        all
    }
}

/// Walks a rendered property value and records every `Ref` / `Fn::GetAtt`
/// target that is a declared resource (pseudo parameters are skipped)
pub fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    if !id.starts_with("AWS::") {
                        found.insert(id.clone());
                    }
                    return;
                }
                if let Some(target) = map.get("Fn::GetAtt") {
                    match target {
                        Value::Array(parts) => {
                            if let Some(Value::String(id)) = parts.first() {
                                found.insert(id.clone());
                            }
                        }
                        Value::String(dotted) => {
                            if let Some((id, _)) = dotted.split_once('.') {
                                found.insert(id.to_string());
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Expr, Pseudo};
    use serde_json::json;

    #[test]
    fn test_references_found_in_nested_properties() {
        let resource = Resource::new("Service", "AWS::ECS::Service")
            .with_property("Cluster", Expr::reference("Cluster"))
            .with_property(
                "NetworkConfiguration",
                json!({
                    "AwsvpcConfiguration": {
                        "SecurityGroups": [
                            { "Fn::GetAtt": ["SecurityGroup", "GroupId"] }
                        ]
                    }
                }),
            )
            .with_property("Region", Expr::from(Pseudo::Region));

        let refs = resource.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains("Cluster"));
        assert!(refs.contains("SecurityGroup"));
    }

    #[test]
    fn test_dependencies_include_explicit_edges() {
        let resource = Resource::new("Service", "AWS::ECS::Service")
            .with_property("TaskDefinition", Expr::reference("TaskDef"))
            .with_dependency("FileSystem");

        let deps = resource.dependencies();
        assert!(deps.contains("TaskDef"));
        assert!(deps.contains("FileSystem"));
        assert!(!resource.references().contains("FileSystem"));
    }

    #[test]
    fn test_get_property_typed() {
        let resource = Resource::new("Service", "AWS::ECS::Service").with_property("DesiredCount", 1);
        assert_eq!(resource.get_property::<u32>("DesiredCount"), Some(1));
        assert_eq!(resource.get_property::<u32>("Missing"), None);
    }

    #[test]
    fn test_dotted_get_att_reference() {
        let mut found = BTreeSet::new();
        collect_references(&json!({ "Fn::GetAtt": "Alb.DNSName" }), &mut found);
        assert!(found.contains("Alb"));
    }
}
