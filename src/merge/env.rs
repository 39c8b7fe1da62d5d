//! Environment variable merge operations
//!
//! ## Rules
//!
//! - A scalar value replaces whatever was inherited
//! - A list value is combined with an inherited list: in front of it by
//!   default (`prepend`), or after it when declared with `append`
//! - When the kinds differ, the incoming value replaces the inherited one
//! - Duplicate list entries are removed, keeping the first occurrence
//!
//! The `{{ devenv_project_dir }}` placeholder is substituted before merging,
//! so each value refers to the directory of the project that declared it.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use super::MergedEnvVar;
use crate::project::{EnvVarValue, ListDirection};

static PROJECT_DIR_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\{\{\s*devenv_project_dir\s*\}\}").unwrap());

/// Combine an inherited value with an incoming declaration.
pub fn merge_env_var(existing: Option<MergedEnvVar>, incoming: MergedEnvVar) -> MergedEnvVar {
    let Some(existing) = existing else {
        return MergedEnvVar {
            value: dedup_value(incoming.value),
            sources: incoming.sources,
        };
    };

    match (existing.value, incoming.value) {
        (
            EnvVarValue::List { values: inherited, .. },
            EnvVarValue::List { values: own, direction },
        ) => {
            let combined = match direction {
                ListDirection::Prepend => own.into_iter().chain(inherited).collect(),
                ListDirection::Append => inherited.into_iter().chain(own).collect(),
            };
            MergedEnvVar {
                value: EnvVarValue::List {
                    values: dedup(combined),
                    direction,
                },
                sources: existing.sources.union(&incoming.sources).cloned().collect(),
            }
        }
        (_, replacement) => MergedEnvVar {
            value: dedup_value(replacement),
            sources: incoming.sources,
        },
    }
}

/// Replace `{{ devenv_project_dir }}` in every part of `value` with `dir`.
pub fn substitute_project_dir(value: &EnvVarValue, dir: &str) -> EnvVarValue {
    let substitute = |text: &String| PROJECT_DIR_PLACEHOLDER.replace_all(text, NoExpand(dir)).into_owned();
    match value {
        EnvVarValue::Scalar(text) => EnvVarValue::Scalar(substitute(text)),
        EnvVarValue::List { values, direction } => EnvVarValue::List {
            values: values.iter().map(substitute).collect(),
            direction: *direction,
        },
    }
}

fn dedup_value(value: EnvVarValue) -> EnvVarValue {
    match value {
        EnvVarValue::List { values, direction } => EnvVarValue::List {
            values: dedup(values),
            direction,
        },
        scalar => scalar,
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
