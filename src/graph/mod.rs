//! Directed graph over job templates.
//!
//! Edges run from a template to each template it depends on. Scheduling needs
//! the graph to be acyclic and visits templates dependencies-first.

use std::collections::HashMap;

use crate::error::PlanError;
use crate::job::{TemplateCatalog, TemplateId};

pub mod builder;

pub use builder::GraphBuilder;

#[derive(Debug, Clone)]
pub struct TemplateGraph {
    nodes: Vec<TemplateId>,
    index: HashMap<TemplateId, usize>,
    edges: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl TemplateGraph {
    pub fn build(catalog: &TemplateCatalog, roots: &[TemplateId]) -> Result<Self, PlanError> {
        GraphBuilder::new(catalog).build(roots)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Templates in discovery order.
    pub fn templates(&self) -> &[TemplateId] {
        &self.nodes
    }

    pub fn contains(&self, template: TemplateId) -> bool {
        self.index.contains_key(&template)
    }

    pub fn dependencies_of(&self, template: TemplateId) -> Vec<TemplateId> {
        self.index
            .get(&template)
            .map(|idx| self.edges[*idx].iter().map(|dep| self.nodes[*dep]).collect())
            .unwrap_or_default()
    }

    /// A cycle as a list of templates, each depending on the next and the
    /// last on the first.
    pub fn find_cycle(&self) -> Option<Vec<TemplateId>> {
        self.depth_first().err()
    }

    /// Topological order: every template before the templates it depends on.
    pub fn topological_order(&self) -> Result<Vec<TemplateId>, PlanError> {
        let mut order = self.scheduling_order()?;
        order.reverse();
        Ok(order)
    }

    /// Reverse topological order: dependencies first, roots last. Templates
    /// that do not constrain each other keep their discovery order.
    pub fn scheduling_order(&self) -> Result<Vec<TemplateId>, PlanError> {
        self.depth_first()
            .map_err(|templates| PlanError::CyclicDependency { templates })
    }

    /// Iterative DFS over all nodes. Returns the post-order on success or the
    /// first cycle met.
    fn depth_first(&self) -> Result<Vec<TemplateId>, Vec<TemplateId>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut post_order = Vec::with_capacity(self.nodes.len());

        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&next) = self.edges[node].get(frame.1) else {
                    marks[node] = Mark::Done;
                    post_order.push(self.nodes[node]);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;
                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        stack.push((next, 0));
                    }
                    Mark::InProgress => {
                        let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        return Err(stack[from..].iter().map(|(n, _)| self.nodes[*n]).collect());
                    }
                    Mark::Done => {}
                }
            }
        }
        Ok(post_order)
    }
}
