//! Phase 3: Consolidation
//!
//! This is the core of the `pixi-devenv` pipeline. It merges the declarations
//! of an ordered [`Graph`] into one [`ConsolidatedProject`] for a starting
//! project.
//!
//! ## Process
//!
//! 1.  **Per-project state**: Projects are visited upstream-first. For each
//!     project the engine computes its upstream closure, the set of projects it
//!     inherits each category from, its resolved platforms and its merged
//!     defaults. Inheritance composes: a project inherits from `P` only if one of
//!     its direct upstream projects does, or `P` is that upstream itself, and
//!     its own `inherit` settings allow `P`.
//!
//! 2.  **Platform filtering**: Target sections are matched against the resolved
//!     platforms of the project being consolidated *before* merging. A target
//!     that does not match contributes nothing.
//!
//! 3.  **Constraints**: Every project in the closure contributes its
//!     constraints. They only tighten dependencies that are already present.
//!
//! 4.  **Features**: Folded for the starting project only, as requested by its
//!     `inherit.features` table. Its own definition is merged last.
//!
//! 5.  **Environments**: Passed through from the starting project.
//!
//! Any failure is annotated with the name of the project being processed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use super::{Graph, ProjectOrder};
use crate::error::{Error, Result};
use crate::merge::{
    apply_constraints, merge_env_var, merge_spec, substitute_project_dir, MergedEnvVar,
    MergedSpec,
};
use crate::path::relative_to;
use crate::platform::{resolve_platforms, Platform, TargetSelector};
use crate::project::{Aspect, Environment, InheritMode, Project, ProjectName, Section};

/// Environment variable that points at the directory of the generated
/// `pixi.toml` when activated.
pub const PROJECT_ROOT_VAR: &str = "$PIXI_PROJECT_ROOT";

/// Merged dependencies and env-vars of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MergedSection {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, MergedSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pypi_dependencies: BTreeMap<String, MergedSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, MergedEnvVar>,
}

impl MergedSection {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.pypi_dependencies.is_empty() && self.env_vars.is_empty()
    }
}

/// A merged base section plus the target sections that apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedAspect {
    #[serde(flatten)]
    pub base: MergedSection,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub target: BTreeMap<TargetSelector, MergedSection>,
}

/// The fully merged view of a starting project, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedProject {
    pub name: ProjectName,
    pub channels: Vec<String>,
    pub platforms: BTreeSet<Platform>,
    pub defaults: MergedAspect,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, MergedAspect>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, Environment>,
}

/// Execute Phase 3: consolidate `starting` from an ordered graph.
///
/// `platforms` overrides the resolved platforms of the starting project when
/// given and non-empty.
pub fn execute(
    graph: &Graph,
    order: &ProjectOrder,
    starting: &ProjectName,
    platforms: Option<&BTreeSet<Platform>>,
) -> Result<ConsolidatedProject> {
    let start = lookup(graph, starting)?;
    let closure = graph.closure(starting);
    let relevant: Vec<&ProjectName> = order.downstream().filter(|n| closure.contains(*n)).collect();

    let mut states: BTreeMap<&ProjectName, ProjectState> = BTreeMap::new();
    for name in &relevant {
        let project = lookup(graph, name)?;
        let explicit = if *name == starting { platforms } else { None };
        let state = project_state(graph, project, &relevant, &states, explicit)
            .map_err(|e| e.in_project(name))?;
        debug!(
            "Consolidated defaults of '{}' ({} dependencies, {} platform(s))",
            name,
            state.defaults.base.dependencies.len(),
            state.platforms.len()
        );
        states.insert(*name, state);
    }

    let state = states.remove(starting).ok_or_else(|| not_in_graph(starting))?;
    let features = consolidate_features(graph, start, &relevant, &state)
        .map_err(|e| e.in_project(starting))?;

    let mut channels: Vec<String> = Vec::new();
    let upstream_channels = relevant
        .iter()
        .rev()
        .filter(|name| **name != starting)
        .filter_map(|name| graph.project(name))
        .flat_map(|project| project.channels());
    for channel in start.channels().iter().chain(upstream_channels) {
        if !channels.contains(channel) {
            channels.push(channel.clone());
        }
    }

    info!(
        "Consolidated '{}' from {} project(s)",
        starting,
        relevant.len()
    );

    Ok(ConsolidatedProject {
        name: starting.clone(),
        channels,
        platforms: state.platforms,
        defaults: state.defaults,
        features,
        environments: start.environments().clone(),
    })
}

/// Resolved platforms of `name` within an ordered graph.
pub fn resolved_platforms(
    graph: &Graph,
    order: &ProjectOrder,
    name: &ProjectName,
    explicit: Option<&BTreeSet<Platform>>,
) -> Result<BTreeSet<Platform>> {
    let project = lookup(graph, name)?;
    let closure = graph.closure(name);
    let upstream = order
        .downstream()
        .filter(|n| *n != name && closure.contains(*n))
        .filter_map(|n| graph.project(n))
        .map(|p| p.platforms());
    Ok(resolve_platforms(project.platforms(), upstream, explicit))
}

fn lookup<'g>(graph: &'g Graph, name: &ProjectName) -> Result<&'g Project> {
    graph.project(name).ok_or_else(|| not_in_graph(name))
}

fn not_in_graph(name: &ProjectName) -> Error {
    Error::NotFound {
        reference: name.to_string(),
        message: "project is not part of the graph".to_string(),
        hint: None,
    }
}

/// What a project has computed once its turn in the order has come.
struct ProjectState {
    /// Every project upstream of this one, excluding itself.
    ancestors: BTreeSet<ProjectName>,
    contributors: Contributors,
    platforms: BTreeSet<Platform>,
    defaults: MergedAspect,
}

/// Projects whose declarations flow into a project, per category.
#[derive(Default)]
struct Contributors {
    dependencies: BTreeSet<ProjectName>,
    pypi_dependencies: BTreeSet<ProjectName>,
    env_vars: BTreeSet<ProjectName>,
}

fn project_state(
    graph: &Graph,
    project: &Project,
    relevant: &[&ProjectName],
    states: &BTreeMap<&ProjectName, ProjectState>,
    explicit: Option<&BTreeSet<Platform>>,
) -> Result<ProjectState> {
    let name = project.name();
    let direct: Vec<&ProjectState> = graph
        .direct_upstream(name)
        .iter()
        .filter_map(|up| states.get(up))
        .collect();

    let mut ancestors: BTreeSet<ProjectName> = graph.direct_upstream(name).iter().cloned().collect();
    for state in &direct {
        ancestors.extend(state.ancestors.iter().cloned());
    }

    let inherit = project.inherit();
    let categories = [
        &inherit.dependencies,
        &inherit.pypi_dependencies,
        &inherit.env_vars,
    ];
    for mode in categories {
        check_allowlist(mode, &ancestors, name, "[devenv.inherit]")?;
    }

    let inherited = |mode: &InheritMode, pick: fn(&Contributors) -> &BTreeSet<ProjectName>| {
        let mut set: BTreeSet<ProjectName> = direct
            .iter()
            .flat_map(|state| pick(&state.contributors).iter())
            .filter(|u| mode.allows(u))
            .cloned()
            .collect();
        set.insert(name.clone());
        set
    };
    let contributors = Contributors {
        dependencies: inherited(&inherit.dependencies, |c| &c.dependencies),
        pypi_dependencies: inherited(&inherit.pypi_dependencies, |c| &c.pypi_dependencies),
        env_vars: inherited(&inherit.env_vars, |c| &c.env_vars),
    };

    let upstream_platforms = relevant
        .iter()
        .filter(|n| ancestors.contains(**n))
        .filter_map(|n| graph.project(n))
        .map(|p| p.platforms());
    let platforms = resolve_platforms(project.platforms(), upstream_platforms, explicit);

    let mut fold = Fold::new(&platforms, name);
    for source in relevant
        .iter()
        .filter(|n| **n == name || ancestors.contains(**n))
    {
        let contributor = lookup(graph, source)?;
        let include = Include {
            dependencies: contributors.dependencies.contains(*source),
            pypi_dependencies: contributors.pypi_dependencies.contains(*source),
            env_vars: contributors.env_vars.contains(*source),
            constraints: true,
        };
        let dir = project_dir(project.location(), contributor.location());
        fold.absorb(source, contributor.defaults(), include, &dir)?;
    }
    let defaults = fold.finish()?;

    Ok(ProjectState {
        ancestors,
        contributors,
        platforms,
        defaults,
    })
}

fn consolidate_features(
    graph: &Graph,
    start: &Project,
    relevant: &[&ProjectName],
    state: &ProjectState,
) -> Result<BTreeMap<String, MergedAspect>> {
    let requested = &start.inherit().features;
    let mut names: BTreeSet<&String> = start.features().keys().collect();
    names.extend(
        requested
            .iter()
            .filter(|(_, mode)| **mode != InheritMode::None)
            .map(|(feature, _)| feature),
    );

    let root = project_dir(start.location(), start.location());
    let mut features = BTreeMap::new();
    for feature in names {
        let mode = requested.get(feature);
        if let Some(mode) = mode {
            check_allowlist(mode, &state.ancestors, start.name(), "[devenv.inherit.features]")?;
        }

        let mut fold = Fold::new(&state.platforms, start.name());
        for source in relevant {
            let contributor = lookup(graph, source)?;
            let dir = project_dir(start.location(), contributor.location());
            fold.absorb(source, contributor.defaults(), Include::CONSTRAINTS, &dir)?;
        }

        let mut defined = false;
        if let Some(mode) = mode {
            for source in relevant
                .iter()
                .filter(|n| state.ancestors.contains(**n) && mode.allows(n))
            {
                let contributor = lookup(graph, source)?;
                if let Some(aspect) = contributor.features().get(feature) {
                    let dir = project_dir(start.location(), contributor.location());
                    fold.absorb(source, aspect, Include::ALL, &dir)?;
                    defined = true;
                }
            }
        }
        if let Some(aspect) = start.features().get(feature) {
            fold.absorb(start.name(), aspect, Include::ALL, &root)?;
            defined = true;
        }

        if !defined {
            return Err(Error::NotFound {
                reference: format!("feature '{}'", feature),
                message: "no allowed upstream project defines this feature".to_string(),
                hint: Some("Check [devenv.inherit.features] and the upstream declarations".to_string()),
            });
        }
        debug!("Folded feature '{}' of '{}'", feature, start.name());
        features.insert(feature.clone(), fold.finish()?);
    }
    Ok(features)
}

fn check_allowlist(
    mode: &InheritMode,
    ancestors: &BTreeSet<ProjectName>,
    project: &ProjectName,
    table: &str,
) -> Result<()> {
    match mode.named_projects().find(|n| !ancestors.contains(*n)) {
        Some(missing) => Err(Error::NotFound {
            reference: missing.to_string(),
            message: format!("'{}' is not an upstream project of '{}'", missing, project),
            hint: Some(format!("Check the project names listed in {}", table)),
        }),
        None => Ok(()),
    }
}

/// Value of `{{ devenv_project_dir }}` for `location`, seen from `base`.
fn project_dir(base: &Path, location: &Path) -> String {
    match relative_to(location, base) {
        Some(relative) if relative.is_empty() => PROJECT_ROOT_VAR.to_string(),
        Some(relative) => format!("{}/{}", PROJECT_ROOT_VAR, relative),
        None => location.display().to_string(),
    }
}

/// Categories of a section taken from one contributor.
#[derive(Debug, Clone, Copy)]
struct Include {
    dependencies: bool,
    pypi_dependencies: bool,
    env_vars: bool,
    constraints: bool,
}

impl Include {
    const ALL: Include = Include {
        dependencies: true,
        pypi_dependencies: true,
        env_vars: true,
        constraints: true,
    };

    const CONSTRAINTS: Include = Include {
        dependencies: false,
        pypi_dependencies: false,
        env_vars: false,
        constraints: true,
    };
}

/// Raw merge state of one scope, before constraints are applied.
#[derive(Default)]
struct Accumulator {
    dependencies: BTreeMap<String, MergedSpec>,
    pypi_dependencies: BTreeMap<String, MergedSpec>,
    constraints: BTreeMap<String, Vec<MergedSpec>>,
    env_vars: BTreeMap<String, MergedEnvVar>,
}

impl Accumulator {
    fn absorb(&mut self, source: &ProjectName, section: &Section, include: Include, dir: &str) -> Result<()> {
        if include.dependencies {
            merge_specs_into(&mut self.dependencies, source, &section.dependencies)?;
        }
        if include.pypi_dependencies {
            merge_specs_into(&mut self.pypi_dependencies, source, &section.pypi_dependencies)?;
        }
        if include.constraints {
            for (package, spec) in &section.constraints {
                self.constraints
                    .entry(package.clone())
                    .or_default()
                    .push(MergedSpec::new(spec.clone(), source.clone()));
            }
        }
        if include.env_vars {
            for (variable, value) in &section.env_vars {
                let incoming = MergedEnvVar::new(substitute_project_dir(value, dir), source.clone());
                let existing = self.env_vars.remove(variable);
                self.env_vars
                    .insert(variable.clone(), merge_env_var(existing, incoming));
            }
        }
        Ok(())
    }
}

fn merge_specs_into(
    merged: &mut BTreeMap<String, MergedSpec>,
    source: &ProjectName,
    specs: &BTreeMap<String, crate::project::Spec>,
) -> Result<()> {
    for (package, spec) in specs {
        let incoming = MergedSpec::new(spec.clone(), source.clone());
        let result = match merged.get(package) {
            Some(existing) => merge_spec(package, existing, &incoming)?,
            None => incoming,
        };
        merged.insert(package.clone(), result);
    }
    Ok(())
}

/// Folds aspects of several contributors against one platform set.
struct Fold<'a> {
    platforms: &'a BTreeSet<Platform>,
    target_of: &'a ProjectName,
    base: Accumulator,
    targets: BTreeMap<TargetSelector, Accumulator>,
}

impl<'a> Fold<'a> {
    fn new(platforms: &'a BTreeSet<Platform>, target_of: &'a ProjectName) -> Self {
        Self {
            platforms,
            target_of,
            base: Accumulator::default(),
            targets: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, source: &ProjectName, aspect: &Aspect, include: Include, dir: &str) -> Result<()> {
        self.base.absorb(source, &aspect.base, include, dir)?;
        let mut applied = 0;
        for (selector, section) in aspect.applicable_targets(self.platforms) {
            self.targets
                .entry(*selector)
                .or_default()
                .absorb(source, section, include, dir)?;
            applied += 1;
        }
        if applied < aspect.targets.len() {
            debug!(
                "Dropped {} target section(s) of '{}': no platform of '{}' matches",
                aspect.targets.len() - applied,
                source,
                self.target_of
            );
        }
        Ok(())
    }

    fn finish(self) -> Result<MergedAspect> {
        let no_constraints = BTreeMap::new();
        let base = MergedSection {
            dependencies: constrain(&self.base.dependencies, &self.base.constraints, &no_constraints)?,
            pypi_dependencies: constrain(
                &self.base.pypi_dependencies,
                &self.base.constraints,
                &no_constraints,
            )?,
            env_vars: self.base.env_vars,
        };

        let mut target = BTreeMap::new();
        for (selector, scoped) in self.targets {
            let section = MergedSection {
                dependencies: target_view(
                    &base.dependencies,
                    &scoped.dependencies,
                    &self.base.constraints,
                    &scoped.constraints,
                )?,
                pypi_dependencies: target_view(
                    &base.pypi_dependencies,
                    &scoped.pypi_dependencies,
                    &self.base.constraints,
                    &scoped.constraints,
                )?,
                env_vars: scoped.env_vars,
            };
            if !section.is_empty() {
                target.insert(selector, section);
            }
        }

        Ok(MergedAspect { base, target })
    }
}

fn constraints_for<'c>(
    package: &str,
    base: &'c BTreeMap<String, Vec<MergedSpec>>,
    scoped: &'c BTreeMap<String, Vec<MergedSpec>>,
) -> impl Iterator<Item = &'c MergedSpec> {
    base.get(package)
        .into_iter()
        .chain(scoped.get(package))
        .flatten()
}

fn constrain(
    dependencies: &BTreeMap<String, MergedSpec>,
    base: &BTreeMap<String, Vec<MergedSpec>>,
    scoped: &BTreeMap<String, Vec<MergedSpec>>,
) -> Result<BTreeMap<String, MergedSpec>> {
    dependencies
        .iter()
        .map(|(package, dependency)| {
            let constrained = apply_constraints(package, dependency, constraints_for(package, base, scoped))?;
            Ok((package.clone(), constrained))
        })
        .collect()
}

/// Target dependencies intersected with the base dependency of the same name,
/// plus base dependencies tightened by a target-only constraint.
fn target_view(
    base_dependencies: &BTreeMap<String, MergedSpec>,
    scoped_dependencies: &BTreeMap<String, MergedSpec>,
    base_constraints: &BTreeMap<String, Vec<MergedSpec>>,
    scoped_constraints: &BTreeMap<String, Vec<MergedSpec>>,
) -> Result<BTreeMap<String, MergedSpec>> {
    let mut combined = BTreeMap::new();
    for (package, dependency) in scoped_dependencies {
        let merged = match base_dependencies.get(package) {
            Some(base) => merge_spec(package, base, dependency)?,
            None => dependency.clone(),
        };
        combined.insert(package.clone(), merged);
    }
    let mut view = constrain(&combined, base_constraints, scoped_constraints)?;

    for (package, constraints) in scoped_constraints {
        if view.contains_key(package) {
            continue;
        }
        if let Some(base) = base_dependencies.get(package) {
            view.insert(package.clone(), apply_constraints(package, base, constraints)?);
        }
    }
    Ok(view)
}
