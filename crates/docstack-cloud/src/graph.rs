//! Resource dependency graph
//!
//! Declarations are kept in insertion order. Edges come from two places:
//! references inside properties (inferred) and explicit `depends_on` entries
//! for ordering the engine cannot infer.

use crate::error::{CloudError, Result};
use crate::resource::{Resource, collect_references};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A value published by the stack once it is deployed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub id: String,
    pub description: Option<String>,
    pub value: Value,
}

impl Output {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            description: None,
            value: value.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    outputs: Vec<Output>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource and returns its logical id
    pub fn add(&mut self, resource: Resource) -> Result<String> {
        if self.index.contains_key(&resource.logical_id) {
            return Err(CloudError::DuplicateResource(resource.logical_id));
        }
        let id = resource.logical_id.clone();
        tracing::debug!(logical_id = %id, resource_type = %resource.resource_type, "Declared resource");
        self.index.insert(id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(id)
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.index.get(logical_id).map(|&i| &self.resources[i])
    }

    pub fn get_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.index.get(logical_id).map(|&i| &mut self.resources[i])
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.index.contains_key(logical_id)
    }

    /// Adds an explicit creation-order edge `from -> to`
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.contains(to) {
            return Err(CloudError::ResourceNotFound(to.to_string()));
        }
        let resource = self
            .get_mut(from)
            .ok_or_else(|| CloudError::ResourceNotFound(from.to_string()))?;
        resource.depends_on.insert(to.to_string());
        Ok(())
    }

    pub fn add_output(&mut self, output: Output) -> Result<()> {
        if self.outputs.iter().any(|o| o.id == output.id) {
            return Err(CloudError::DuplicateOutput(output.id));
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Whether `from` transitively depends on `to`
    pub fn depends_on(&self, from: &str, to: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            let Some(resource) = self.get(&current) else {
                continue;
            };
            for dep in resource.dependencies() {
                if dep == to {
                    return true;
                }
                if seen.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
        false
    }

    /// Checks that every edge and output points at a declared resource and
    /// that the graph is acyclic
    pub fn validate(&self) -> Result<()> {
        for resource in &self.resources {
            for dep in resource.dependencies() {
                if !self.contains(&dep) {
                    return Err(CloudError::DanglingReference {
                        from: resource.logical_id.clone(),
                        to: dep,
                    });
                }
            }
        }
        for output in &self.outputs {
            let mut refs = BTreeSet::new();
            collect_references(&output.value, &mut refs);
            if let Some(missing) = refs.into_iter().find(|r| !self.contains(r)) {
                return Err(CloudError::DanglingOutput {
                    output: output.id.clone(),
                    to: missing,
                });
            }
        }
        self.waves().map(|_| ())
    }

    /// Groups resources into creation waves: every resource's dependencies
    /// live in strictly earlier waves. Order inside a wave follows
    /// declaration order.
    pub fn waves(&self) -> Result<Vec<Vec<&Resource>>> {
        let mut remaining: Vec<usize> = vec![0; self.resources.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];

        for (i, resource) in self.resources.iter().enumerate() {
            for dep in resource.dependencies() {
                let j = *self.index.get(&dep).ok_or_else(|| CloudError::DanglingReference {
                    from: resource.logical_id.clone(),
                    to: dep.clone(),
                })?;
                remaining[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut ready: VecDeque<usize> = (0..self.resources.len())
            .filter(|&i| remaining[i] == 0)
            .collect();
        let mut waves = Vec::new();
        let mut placed = 0;

        while !ready.is_empty() {
            let mut wave: Vec<usize> = ready.drain(..).collect();
            wave.sort_unstable();
            let mut next = Vec::new();
            for &i in &wave {
                for &d in &dependents[i] {
                    remaining[d] -= 1;
                    if remaining[d] == 0 {
                        next.push(d);
                    }
                }
            }
            placed += wave.len();
            waves.push(wave.into_iter().map(|i| &self.resources[i]).collect());
            ready.extend(next);
        }

        if placed != self.resources.len() {
            let stuck: Vec<&str> = self
                .resources
                .iter()
                .enumerate()
                .filter(|(i, _)| remaining[*i] > 0)
                .map(|(_, r)| r.logical_id.as_str())
                .collect();
            return Err(CloudError::CircularDependency(stuck.join(" -> ")));
        }

        Ok(waves)
    }

    /// Resources in a valid creation order
    pub fn topological_order(&self) -> Result<Vec<&Resource>> {
        Ok(self.waves()?.into_iter().flatten().collect())
    }
}
