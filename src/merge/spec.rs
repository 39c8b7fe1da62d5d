//! Package spec merge operations
//!
//! Two specs for the same package merge into one whose version range is the
//! intersection of both. `build` and `channel` qualifiers merge only when at
//! most one distinct value is present.

use log::trace;

use super::MergedSpec;
use crate::error::{Error, Result};
use crate::project::Spec;

/// Merge `incoming` into `existing`, intersecting the version ranges.
///
/// # Errors
///
/// - [`Error::ConstraintConflict`] when the ranges do not overlap
/// - [`Error::SpecFieldConflict`] when `build` or `channel` differ
pub fn merge_spec(package: &str, existing: &MergedSpec, incoming: &MergedSpec) -> Result<MergedSpec> {
    let version = existing
        .spec
        .version
        .intersect(&incoming.spec.version)
        .ok_or_else(|| Error::ConstraintConflict {
            package: package.to_string(),
            left: existing.spec.version.to_string(),
            right: incoming.spec.version.to_string(),
            sources: existing
                .sources
                .union(&incoming.sources)
                .map(|name| name.to_string())
                .collect(),
        })?;

    let build = merge_qualifier(package, "build", &existing.spec.build, &incoming.spec.build)?;
    let channel = merge_qualifier(
        package,
        "channel",
        &existing.spec.channel,
        &incoming.spec.channel,
    )?;

    trace!(
        "Merged {} '{}' with '{}' into '{}'",
        package,
        existing.spec.version,
        incoming.spec.version,
        version
    );

    Ok(MergedSpec {
        spec: Spec {
            version,
            build,
            channel,
        },
        sources: existing.sources.union(&incoming.sources).cloned().collect(),
    })
}

/// Tighten `dependency` by every constraint in `constraints`, in order.
pub fn apply_constraints<'a>(
    package: &str,
    dependency: &MergedSpec,
    constraints: impl IntoIterator<Item = &'a MergedSpec>,
) -> Result<MergedSpec> {
    constraints
        .into_iter()
        .try_fold(dependency.clone(), |merged, constraint| {
            merge_spec(package, &merged, constraint)
        })
}

fn merge_qualifier(
    package: &str,
    field: &'static str,
    left: &Option<String>,
    right: &Option<String>,
) -> Result<Option<String>> {
    match (left, right) {
        (Some(l), Some(r)) if l != r => Err(Error::SpecFieldConflict {
            package: package.to_string(),
            field,
            left: l.clone(),
            right: r.clone(),
        }),
        (Some(value), _) | (None, Some(value)) => Ok(Some(value.clone())),
        (None, None) => Ok(None),
    }
}
