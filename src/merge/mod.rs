//! Merge operations for inherited declarations
//!
//! Every value that flows from an upstream project into a downstream one goes
//! through this module. Each kind of value has its own submodule with
//! specialized merge logic.
//!
//! ## Value Kinds
//!
//! - Package specs (spec.rs) - Version ranges are intersected, `build` and
//!   `channel` must agree
//! - Environment variables (env.rs) - Scalars replace, lists prepend or append
//!
//! ## Provenance
//!
//! Merged values carry the set of project names that contributed to them.
//! The set is ordered, so rendering provenance is deterministic.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::project::{EnvVarValue, ProjectName, Spec};

pub mod env;
pub mod spec;

pub use env::{merge_env_var, substitute_project_dir};
pub use spec::{apply_constraints, merge_spec};

/// Names of the projects that contributed to a merged value.
pub type Sources = BTreeSet<ProjectName>;

/// A package spec together with the projects that shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSpec {
    #[serde(flatten)]
    pub spec: Spec,
    pub sources: Sources,
}

impl MergedSpec {
    pub fn new(spec: Spec, source: ProjectName) -> Self {
        Self {
            spec,
            sources: BTreeSet::from([source]),
        }
    }
}

/// An environment variable value together with the projects that shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEnvVar {
    pub value: EnvVarValue,
    pub sources: Sources,
}

impl MergedEnvVar {
    pub fn new(value: EnvVarValue, source: ProjectName) -> Self {
        Self {
            value,
            sources: BTreeSet::from([source]),
        }
    }
}
