// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Step dependency graph
//!
//! Builds and validates the dependency DAG for pipeline steps. Dependencies
//! may only reference earlier-declared steps, which makes the graph acyclic
//! by construction; acyclicity is still verified after building.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::RunflowError;
use crate::pipeline::template::{self, TemplateRef};
use crate::pipeline::PipelineDefinition;

/// Dependency graph over pipeline steps
pub struct StepGraph {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl StepGraph {
    /// Build the graph for a pipeline
    ///
    /// Edges come from each step's `needs` plus implicit edges for steps its
    /// condition reads and steps whose outputs its command template reads.
    /// Fails on duplicate names, unknown dependencies, and forward
    /// references.
    pub fn build(pipeline: &PipelineDefinition) -> Result<Self, RunflowError> {
        let mut builder = Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        };

        for (idx, step) in pipeline.steps.iter().enumerate() {
            if builder.name_to_index.contains_key(&step.name) {
                return Err(RunflowError::DuplicateStep {
                    step: step.name.clone(),
                });
            }
            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(step.name.clone(), node);
            builder.index_to_name.insert(node, step.name.clone());
        }

        for (idx, step) in pipeline.steps.iter().enumerate() {
            let step_node = builder.name_to_index[&step.name];

            // Explicit dependencies from needs
            for dep_name in &step.needs {
                let dep_node = builder.resolve_dependency(pipeline, idx, &step.name, dep_name)?;
                builder.graph.add_edge(dep_node, step_node, ());
            }

            // Implicit dependencies from condition references
            for dep_name in step.condition.referenced_steps() {
                let dep_node = builder.resolve_dependency(pipeline, idx, &step.name, dep_name)?;
                if !builder.graph.contains_edge(dep_node, step_node) {
                    builder.graph.add_edge(dep_node, step_node, ());
                }
            }

            // Implicit dependencies from template output reads
            for reference in template::references(&step.run) {
                if let TemplateRef::StepOutput { step: dep_name, .. } = reference {
                    let dep_node =
                        builder.resolve_dependency(pipeline, idx, &step.name, &dep_name)?;
                    if !builder.graph.contains_edge(dep_node, step_node) {
                        builder.graph.add_edge(dep_node, step_node, ());
                    }
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    /// Resolve a dependency name, enforcing the earlier-declaration rule
    fn resolve_dependency(
        &self,
        pipeline: &PipelineDefinition,
        step_idx: usize,
        step_name: &str,
        dep_name: &str,
    ) -> Result<NodeIndex, RunflowError> {
        let dep_node =
            self.name_to_index
                .get(dep_name)
                .ok_or_else(|| RunflowError::UnknownDependency {
                    step: step_name.to_string(),
                    dependency: dep_name.to_string(),
                })?;

        let dep_idx = pipeline
            .step_index(dep_name)
            .expect("dependency node exists, so the step must too");

        if dep_idx >= step_idx {
            return Err(RunflowError::ForwardReference {
                step: step_name.to_string(),
                dependency: dep_name.to_string(),
            });
        }

        Ok(*dep_node)
    }

    /// Validate that the graph is acyclic
    ///
    /// Cycles cannot occur once forward references are rejected; checked
    /// anyway.
    fn validate_acyclic(&self) -> Result<(), RunflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(RunflowError::CircularDependency {
                steps: vec![self.index_to_name[&cycle.node_id()].clone()],
            }),
        }
    }

    /// Execution order for the pipeline
    ///
    /// Declaration order is a valid topological order once forward
    /// references are rejected, so execution follows it exactly.
    pub fn execution_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = self.graph.node_indices().map(|n| self.graph[n]).collect();
        order.sort_unstable();
        order
    }

    /// Direct dependencies of a step (steps that must run before it)
    pub fn dependencies(&self, step_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(step_name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Direct dependents of a step (steps that read its outputs)
    pub fn dependents(&self, step_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(step_name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Outgoing)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Check if step A depends (directly or transitively) on step B
    pub fn depends_on(&self, step_a: &str, step_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(step_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(step_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        let mut names: Vec<_> = self.name_to_index.keys().collect();
        names.sort();
        for name in names {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            out.push_str(&format!(
                "    {} --> {}\n",
                self.index_to_name[&from], self.index_to_name[&to]
            ));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.index_to_name[&from], self.index_to_name[&to]
            ));
        }

        // Isolated nodes carry no edges, list them explicitly
        for (name, node) in &self.name_to_index {
            if self.graph.neighbors_undirected(*node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of the execution order
    pub fn to_text(&self, pipeline: &PipelineDefinition) -> String {
        let mut out = String::new();

        for (i, idx) in self.execution_order().iter().enumerate() {
            let step = &pipeline.steps[*idx];
            let deps = self.dependencies(&step.name).unwrap_or_default();

            out.push_str(&format!("{}. {}", i + 1, step.name));

            if !deps.is_empty() {
                out.push_str(&format!(" [needs: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }
}
