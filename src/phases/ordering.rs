//! Phase 2: Determining Project Order
//!
//! This is the second phase of the `pixi-devenv` pipeline. It sorts the
//! projects of a [`Graph`] so that every project comes after all of its
//! upstream projects.
//!
//! ## Process
//!
//! 1.  **Kahn's Algorithm**: Projects with no unprocessed upstream are ready.
//!     Among ready projects the one with the smallest name is emitted first,
//!     so the order does not depend on how `upstream` lists were written.
//!
//! 2.  **Cycle Check**: Every upstream name must be a project of the graph.
//!     Graphs produced by discovery are acyclic. A graph that
//!     still has projects left once nothing is ready contains a cycle, which
//!     is reported with its path.
//!
//! This phase produces a [`ProjectOrder`] ready for consolidation.

use std::collections::{BTreeMap, BTreeSet};

use super::{Graph, ProjectOrder};
use crate::error::{Error, Result};
use crate::project::ProjectName;

/// Execute Phase 2: order the graph upstream-first.
pub fn execute(graph: &Graph) -> Result<ProjectOrder> {
    let mut pending: BTreeMap<&ProjectName, usize> = BTreeMap::new();
    let mut downstream: BTreeMap<&ProjectName, Vec<&ProjectName>> = BTreeMap::new();

    for name in graph.discovery_order() {
        let upstream = graph.direct_upstream(name);
        pending.insert(name, upstream.len());
        for up in upstream {
            if graph.project(up).is_none() {
                return Err(Error::NotFound {
                    reference: up.to_string(),
                    message: format!("upstream project of '{}' is not part of the graph", name),
                    hint: None,
                });
            }
            downstream.entry(up).or_default().push(name);
        }
    }

    let mut ready: BTreeSet<&ProjectName> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(pending.len());

    while let Some(name) = ready.pop_first() {
        order.push(name.clone());
        for dependent in downstream.get(name).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() < pending.len() {
        let blocked: BTreeSet<&ProjectName> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, _)| *name)
            .collect();
        return Err(Error::Cycle {
            cycle: find_cycle(graph, &blocked),
        });
    }

    Ok(ProjectOrder::new(order))
}

/// Walk upstream edges among `blocked` projects until a name repeats.
fn find_cycle(graph: &Graph, blocked: &BTreeSet<&ProjectName>) -> Vec<ProjectName> {
    let Some(first) = blocked.first() else {
        return Vec::new();
    };

    let mut path: Vec<ProjectName> = vec![(*first).clone()];
    loop {
        let current = &path[path.len() - 1];
        let next = graph
            .direct_upstream(current)
            .iter()
            .find(|up| blocked.contains(up));
        let Some(next) = next else {
            return path;
        };
        if let Some(position) = path.iter().position(|name| name == next) {
            let mut cycle = path.split_off(position);
            cycle.push(next.clone());
            return cycle;
        }
        path.push(next.clone());
    }
}
