//! Implementation of the phases of the `pixi-devenv update` operation.
//!
//! ## Overview
//!
//! An update runs these phases:
//! 1. Discovery - Load the starting project and every upstream project it
//!    transitively references into a [`Graph`]
//! 2. Ordering - Calculate a deterministic upstream-to-downstream [`ProjectOrder`]
//! 3. Consolidation - Merge the declarations of the graph into one
//!    `ConsolidatedProject` for the starting project
//! 4. Writing - Render the consolidated project into `pixi.toml`
//!
//! Each phase depends only on the previous phases and the foundation modules
//! (`project`, `platform`, `version`, `merge`).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::project::{Project, ProjectName};

// Phase modules
pub mod consolidate;
pub mod discovery;
pub mod orchestrator;
pub mod ordering;
pub mod write;

/// Directed graph of projects linked by their `upstream` references.
///
/// Project names are unique within a graph: discovery rejects two locations
/// declaring the same name.
#[derive(Debug, Clone)]
pub struct Graph {
    /// The project the graph was built from.
    start: ProjectName,
    /// Every project reachable from `start`, including it.
    projects: BTreeMap<ProjectName, Arc<Project>>,
    /// Project -> its direct upstream projects, in declaration order.
    upstream: BTreeMap<ProjectName, Vec<ProjectName>>,
    /// Names in the order they were first discovered.
    discovery: Vec<ProjectName>,
}

impl Graph {
    pub fn new(start: ProjectName) -> Self {
        Self {
            start,
            projects: BTreeMap::new(),
            upstream: BTreeMap::new(),
            discovery: Vec::new(),
        }
    }

    /// Add a project and its direct upstream names.
    pub fn add_project(&mut self, project: Arc<Project>, upstream: Vec<ProjectName>) {
        let name = project.name().clone();
        if !self.projects.contains_key(&name) {
            self.discovery.push(name.clone());
        }
        self.upstream.insert(name.clone(), upstream);
        self.projects.insert(name, project);
    }

    pub fn start(&self) -> &ProjectName {
        &self.start
    }

    pub fn project(&self, name: &ProjectName) -> Option<&Project> {
        self.projects.get(name).map(|p| p.as_ref())
    }

    /// Direct upstream projects of `name`, in declaration order.
    pub fn direct_upstream(&self, name: &ProjectName) -> &[ProjectName] {
        self.upstream.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Project names in discovery order.
    pub fn discovery_order(&self) -> &[ProjectName] {
        &self.discovery
    }

    /// `name` and every project it transitively depends on.
    pub fn closure(&self, name: &ProjectName) -> BTreeSet<ProjectName> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.clone()];
        while let Some(current) = stack.pop() {
            if seen.insert(current.clone()) {
                stack.extend(self.direct_upstream(&current).iter().cloned());
            }
        }
        seen
    }
}

/// Upstream-to-downstream order for deterministic consolidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOrder {
    /// Project names, upstream-most first
    pub order: Vec<ProjectName>,
}

impl ProjectOrder {
    pub fn new(order: Vec<ProjectName>) -> Self {
        Self { order }
    }

    /// Iterate from the top upstream all the way down.
    pub fn downstream(&self) -> impl DoubleEndedIterator<Item = &ProjectName> {
        self.order.iter()
    }
}


#[cfg(test)]
mod phase_tests {
    use super::test_support::graph;
    use super::*;

    #[test]
    fn test_graph_closure() {
        let graph = graph(&[
            ("app", &["calc", "gui"]),
            ("calc", &["core"]),
            ("gui", &[]),
            ("core", &[]),
            ("other", &[]),
        ]);

        let closure = graph.closure(&ProjectName::from("calc"));
        assert_eq!(
            closure,
            [ProjectName::from("calc"), ProjectName::from("core")]
                .into_iter()
                .collect()
        );
        assert_eq!(graph.closure(&ProjectName::from("app")).len(), 4);
    }

    #[test]
    fn test_graph_discovery_order_and_lookup() {
        let graph = graph(&[("app", &["core"]), ("core", &[])]);
        assert_eq!(
            graph.discovery_order(),
            [ProjectName::from("app"), ProjectName::from("core")]
        );
        assert_eq!(graph.project(graph.start()).unwrap().name().as_str(), "app");
        assert!(graph.project(&ProjectName::from("core")).is_some());
        assert!(graph.direct_upstream(&ProjectName::from("missing")).is_empty());
    }

    #[test]
    fn test_project_order_iteration() {
        let order = ProjectOrder::new(vec![
            ProjectName::from("core"),
            ProjectName::from("calc"),
        ]);
        assert_eq!(
            order.downstream().rev().map(|n| n.as_str()).collect::<Vec<_>>(),
            ["calc", "core"]
        );
    }
}
