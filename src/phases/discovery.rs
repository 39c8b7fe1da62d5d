//! Phase 1: Discovery
//!
//! This is the first phase of the `pixi-devenv` pipeline. It loads the
//! starting project and every project it transitively references through
//! `upstream` into a [`Graph`].
//!
//! ## Process
//!
//! 1.  **Loading**: Declarations are requested from a [`Loader`] and memoized in
//!     a caller-owned [`DeclarationCache`], so a shared upstream is loaded once
//!     no matter how many paths lead to it.
//!
//! 2.  **Traversal**: Upstream references are followed depth-first, resolving
//!     each path against the directory of the project that declares it.
//!
//! 3.  **Cycle Detection**: The traversal keeps the current chain of locations.
//!     Reaching a location already on the chain aborts with the cycle path
//!     (e.g. `A -> B -> A`).
//!
//! 4.  **Name Uniqueness**: Two distinct locations declaring the same project
//!     name abort with a duplicate-project error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use super::Graph;
use crate::error::{Error, Result};
use crate::loader::{DeclarationCache, Loader};
use crate::path::{normalize, resolve_upstream};
use crate::project::ProjectName;

/// Executes Phase 1 of the pipeline.
///
/// Builds the graph rooted at the project located at `start`.
pub fn execute(start: &Path, loader: &dyn Loader, cache: &mut DeclarationCache) -> Result<Graph> {
    let start = normalize(start);
    let root = cache.get_or_load(&start, loader)?;

    let mut walker = Walker {
        loader,
        cache,
        graph: Graph::new(root.name().clone()),
        names_by_location: HashMap::new(),
        locations_by_name: HashMap::new(),
        chain: Vec::new(),
    };
    walker.visit(&start)?;

    debug!(
        "Discovered {} project(s) upstream of and including '{}'",
        walker.graph.discovery_order().len(),
        walker.graph.start()
    );
    Ok(walker.graph)
}

struct Walker<'a> {
    loader: &'a dyn Loader,
    cache: &'a mut DeclarationCache,
    graph: Graph,
    names_by_location: HashMap<PathBuf, ProjectName>,
    locations_by_name: HashMap<ProjectName, PathBuf>,
    /// Locations of the projects on the current path from the start.
    chain: Vec<(PathBuf, ProjectName)>,
}

impl Walker<'_> {
    fn visit(&mut self, location: &Path) -> Result<ProjectName> {
        if let Some(position) = self.chain.iter().position(|(loc, _)| loc == location) {
            let mut cycle: Vec<ProjectName> = self.chain[position..]
                .iter()
                .map(|(_, name)| name.clone())
                .collect();
            cycle.push(self.chain[position].1.clone());
            return Err(Error::Cycle { cycle });
        }
        if let Some(name) = self.names_by_location.get(location) {
            return Ok(name.clone());
        }

        let project = match self.chain.last() {
            Some((_, referrer)) => {
                let referrer = referrer.clone();
                self.cache
                    .get_or_load(location, self.loader)
                    .map_err(|e| e.in_project(&referrer))?
            }
            None => self.cache.get_or_load(location, self.loader)?,
        };
        let name = project.name().clone();

        if let Some(first) = self.locations_by_name.get(&name) {
            return Err(Error::DuplicateProject {
                name,
                first: first.clone(),
                second: location.to_path_buf(),
            });
        }
        debug!("Loaded project '{}' from {}", name, location.display());

        self.names_by_location
            .insert(location.to_path_buf(), name.clone());
        self.locations_by_name
            .insert(name.clone(), location.to_path_buf());
        self.chain.push((location.to_path_buf(), name.clone()));

        let mut upstream = Vec::with_capacity(project.upstream().len());
        for reference in project.upstream() {
            let target = resolve_upstream(location, &reference.path);
            let upstream_name = self.visit(&target)?;
            if !upstream.contains(&upstream_name) {
                upstream.push(upstream_name);
            }
        }

        self.chain.pop();
        self.graph.add_project(project, upstream);
        Ok(name)
    }
}
