use super::TemplateGraph;
use crate::error::PlanError;
use crate::job::{TemplateCatalog, TemplateId};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub struct GraphBuilder<'a> {
    catalog: &'a TemplateCatalog,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a TemplateCatalog) -> Self {
        Self { catalog }
    }

    pub fn build(&self, roots: &[TemplateId]) -> Result<TemplateGraph, PlanError> {
        // Step 1: Discover every template reachable from the roots
        let nodes = self.discover(roots)?;

        // Step 2: Index nodes by template identity
        let index: HashMap<TemplateId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, id)| (*id, idx))
            .collect();

        // Step 3: One edge from each template to each of its dependencies
        let mut edges = vec![Vec::new(); nodes.len()];
        for (idx, id) in nodes.iter().enumerate() {
            for dependency in self.catalog.get(*id)?.dependencies() {
                let target = index
                    .get(dependency)
                    .copied()
                    .ok_or(PlanError::UnknownTemplate(*dependency))?;
                if !edges[idx].contains(&target) {
                    edges[idx].push(target);
                }
            }
        }

        let graph = TemplateGraph {
            nodes,
            index,
            edges,
        };
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "template graph built"
        );
        Ok(graph)
    }

    /// Breadth-first from the roots, each template once, in discovery order.
    fn discover(&self, roots: &[TemplateId]) -> Result<Vec<TemplateId>, PlanError> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<TemplateId> = VecDeque::new();

        for root in roots {
            if seen.insert(*root) {
                queue.push_back(*root);
            }
        }

        while let Some(id) = queue.pop_front() {
            let template = self.catalog.get(id)?;
            order.push(id);
            for dependency in template.dependencies() {
                if seen.insert(*dependency) {
                    queue.push_back(*dependency);
                }
            }
        }
        Ok(order)
    }
}
