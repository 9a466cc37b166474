//! Deployment plan derived from a resource graph

use crate::error::Result;
use crate::graph::ResourceGraph;
use serde::{Deserialize, Serialize};

/// A single resource creation in the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Logical id of the resource
    pub logical_id: String,

    /// Resource type (e.g., "AWS::RDS::DBInstance")
    pub resource_type: String,

    /// Creation wave; everything this step needs lives in earlier waves
    pub wave: usize,

    /// Every dependency, inferred or explicit
    pub depends_on: Vec<String>,

    /// The subset of `depends_on` declared explicitly
    pub explicit: Vec<String>,
}

/// Ordered creation plan for one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Stack the plan belongs to
    pub stack: String,

    /// Steps in creation order
    pub steps: Vec<Step>,

    /// Published output ids
    pub outputs: Vec<String>,
}

impl Plan {
    pub fn from_graph(stack: impl Into<String>, graph: &ResourceGraph) -> Result<Self> {
        graph.validate()?;
        let mut steps = Vec::with_capacity(graph.len());
        for (wave, resources) in graph.waves()?.into_iter().enumerate() {
            for resource in resources {
                steps.push(Step {
                    logical_id: resource.logical_id.clone(),
                    resource_type: resource.resource_type.clone(),
                    wave,
                    depends_on: resource.dependencies().into_iter().collect(),
                    explicit: resource.depends_on.iter().cloned().collect(),
                });
            }
        }
        Ok(Self {
            stack: stack.into(),
            steps,
            outputs: graph.outputs().iter().map(|o| o.id.clone()).collect(),
        })
    }

    pub fn wave_count(&self) -> usize {
        self.steps.last().map(|s| s.wave + 1).unwrap_or(0)
    }

    /// Get steps of one wave
    pub fn wave(&self, wave: usize) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.wave == wave).collect()
    }

    pub fn step(&self, logical_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.logical_id == logical_id)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            resources: self.steps.len(),
            waves: self.wave_count(),
            explicit_edges: self.steps.iter().map(|s| s.explicit.len()).sum(),
            outputs: self.outputs.len(),
        }
    }
}

/// Summary of a plan
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub resources: usize,
    pub waves: usize,
    pub explicit_edges: usize,
    pub outputs: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} resources in {} waves, {} explicit edges, {} outputs",
            self.resources, self.waves, self.explicit_edges, self.outputs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Output;
    use crate::resource::Resource;
    use crate::value::Expr;

    #[test]
    fn test_plan_waves_and_summary() {
        let mut graph = ResourceGraph::new();
        graph.add(Resource::new("Disk", "Test::Disk")).unwrap();
        graph.add(Resource::new("Db", "Test::Db")).unwrap();
        graph
            .add(
                Resource::new("Task", "Test::Task")
                    .with_property("Host", Expr::attr("Db", "Endpoint.Address")),
            )
            .unwrap();
        graph
            .add(
                Resource::new("Service", "Test::Service")
                    .with_property("Task", Expr::reference("Task"))
                    .with_dependency("Disk"),
            )
            .unwrap();
        graph
            .add_output(Output::new("Endpoint", Expr::attr("Db", "Endpoint.Address")))
            .unwrap();

        let plan = Plan::from_graph("devABookStack", &graph).unwrap();
        assert_eq!(plan.wave_count(), 3);
        assert_eq!(plan.wave(0).len(), 2);
        assert_eq!(plan.step("Service").unwrap().wave, 2);
        assert_eq!(plan.step("Service").unwrap().explicit, vec!["Disk".to_string()]);

        let summary = plan.summary();
        assert_eq!(summary.resources, 4);
        assert_eq!(summary.explicit_edges, 1);
        assert_eq!(
            summary.to_string(),
            "4 resources in 3 waves, 1 explicit edges, 1 outputs"
        );
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::from_graph("empty", &ResourceGraph::new()).unwrap();
        assert_eq!(plan.wave_count(), 0);
        assert!(plan.steps.is_empty());
    }
}
