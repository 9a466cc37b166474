//! Rendering a resource graph into a deployment template
//!
//! The output follows the CloudFormation template layout so the provisioning
//! engine can consume it unchanged.

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::resource::DeletionPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

const FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Deployment-time assertions checked by the engine before any change
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, Value>,

    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

/// Output format for a rendered template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }
}

impl Template {
    /// Validates the graph and renders it. `tags` are attached to every
    /// taggable resource; tags a resource already carries take precedence.
    pub fn render(
        graph: &ResourceGraph,
        description: Option<String>,
        tags: &BTreeMap<String, String>,
    ) -> Result<Self> {
        graph.validate()?;

        let mut resources = BTreeMap::new();
        for resource in graph.iter() {
            let mut properties = resource.properties.clone();
            if let Some(tag_property) = &resource.tag_property
                && !tags.is_empty()
            {
                let merged = merge_tags(properties.get(tag_property), tags);
                properties.insert(tag_property.clone(), merged);
            }
            resources.insert(
                resource.logical_id.clone(),
                TemplateResource {
                    resource_type: resource.resource_type.clone(),
                    properties,
                    depends_on: resource.depends_on.iter().cloned().collect(),
                    deletion_policy: resource.deletion_policy,
                    update_replace_policy: resource.deletion_policy,
                },
            );
        }

        let outputs = graph
            .outputs()
            .iter()
            .map(|o| {
                (
                    o.id.clone(),
                    TemplateOutput {
                        description: o.description.clone(),
                        value: o.value.clone(),
                    },
                )
            })
            .collect();

        tracing::debug!(resources = resources.len(), "Rendered template");
        Ok(Self {
            format_version: FORMAT_VERSION.to_string(),
            description,
            rules: BTreeMap::new(),
            resources,
            outputs,
        })
    }

    /// Adds a rule that fails the deployment unless `left` equals `right`
    pub fn with_equals_rule(
        mut self,
        id: impl Into<String>,
        left: Value,
        right: Value,
        description: impl Into<String>,
    ) -> Self {
        self.rules.insert(
            id.into(),
            json!({
                "Assertions": [{
                    "Assert": { "Fn::Equals": [left, right] },
                    "AssertDescription": description.into(),
                }]
            }),
        );
        self
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_string_as(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => self.to_json_string(),
            TemplateFormat::Yaml => self.to_yaml_string(),
        }
    }
}

fn merge_tags(existing: Option<&Value>, tags: &BTreeMap<String, String>) -> Value {
    let mut merged: Vec<Value> = existing
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for (key, value) in tags {
        let present = merged
            .iter()
            .any(|t| t.get("Key").and_then(Value::as_str) == Some(key.as_str()));
        if !present {
            merged.push(json!({ "Key": key, "Value": value }));
        }
    }
    Value::Array(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Output;
    use crate::resource::Resource;
    use crate::value::Expr;

    fn sample_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph
            .add(Resource::new("Cluster", "AWS::ECS::Cluster").taggable())
            .unwrap();
        graph
            .add(
                Resource::new("Db", "AWS::RDS::DBInstance")
                    .taggable()
                    .with_property("Tags", json!([{ "Key": "Service", "Value": "Custom" }]))
                    .with_deletion_policy(DeletionPolicy::Delete),
            )
            .unwrap();
        graph
            .add(
                Resource::new("Service", "AWS::ECS::Service")
                    .with_property("Cluster", Expr::reference("Cluster"))
                    .with_dependency("Db"),
            )
            .unwrap();
        graph
            .add_output(
                Output::new("EcsClusterId", Expr::reference("Cluster"))
                    .with_description("cluster"),
            )
            .unwrap();
        graph
    }

    fn tags() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Environment".to_string(), "devA".to_string()),
            ("Service".to_string(), "BookStack".to_string()),
        ])
    }

    #[test]
    fn test_render_layout() {
        let template = Template::render(&sample_graph(), Some("test".into()), &tags()).unwrap();
        let json: Value = serde_json::from_str(&template.to_json_string().unwrap()).unwrap();

        assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(json["Resources"]["Service"]["Type"], "AWS::ECS::Service");
        assert_eq!(json["Resources"]["Service"]["DependsOn"], json!(["Db"]));
        assert_eq!(json["Resources"]["Db"]["DeletionPolicy"], "Delete");
        assert_eq!(json["Outputs"]["EcsClusterId"]["Value"], json!({ "Ref": "Cluster" }));
        assert!(json["Resources"]["Cluster"].get("DependsOn").is_none());
    }

    #[test]
    fn test_tags_applied_only_to_taggable() {
        let template = Template::render(&sample_graph(), None, &tags()).unwrap();

        let cluster_tags = template.resource("Cluster").unwrap().properties["Tags"].clone();
        assert_eq!(cluster_tags.as_array().unwrap().len(), 2);

        let db_tags = template.resource("Db").unwrap().properties["Tags"].clone();
        let service_tag: Vec<&Value> = db_tags
            .as_array()
            .unwrap()
            .iter()
            .filter(|t| t["Key"] == "Service")
            .collect();
        assert_eq!(service_tag.len(), 1);
        assert_eq!(service_tag[0]["Value"], "Custom");

        assert!(template.resource("Service").unwrap().properties.get("Tags").is_none());
    }

    #[test]
    fn test_equals_rule() {
        let template = Template::render(&sample_graph(), None, &BTreeMap::new())
            .unwrap()
            .with_equals_rule(
                "DeploymentRegion",
                Expr::from(crate::value::Pseudo::Region).to_json(),
                json!("us-east-2"),
                "deploy to us-east-2",
            );
        let json: Value = serde_json::from_str(&template.to_json_string().unwrap()).unwrap();

        assert_eq!(
            json["Rules"]["DeploymentRegion"]["Assertions"][0]["Assert"],
            json!({ "Fn::Equals": [{ "Ref": "AWS::Region" }, "us-east-2"] })
        );

        let plain = Template::render(&sample_graph(), None, &BTreeMap::new()).unwrap();
        assert!(!plain.to_json_string().unwrap().contains("Rules"));
    }

    #[test]
    fn test_yaml_output() {
        let template = Template::render(&sample_graph(), None, &BTreeMap::new()).unwrap();
        let yaml = template.to_string_as(TemplateFormat::Yaml).unwrap();
        assert!(yaml.contains("AWSTemplateFormatVersion"));
        assert!(yaml.contains("AWS::ECS::Cluster"));
    }

    #[test]
    fn test_render_rejects_invalid_graph() {
        let mut graph = ResourceGraph::new();
        graph
            .add(Resource::new("A", "Test::A").with_dependency("Missing"))
            .unwrap();
        assert!(Template::render(&graph, None, &BTreeMap::new()).is_err());
    }
}
