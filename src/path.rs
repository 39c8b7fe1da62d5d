//! Path manipulation utilities for pixi-devenv
//!
//! Project locations are compared lexically: `upstream` entries are joined onto
//! the declaring project's directory and normalized without touching the
//! filesystem, so graph construction stays a pure function of its inputs.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path, resolving `.` and `..` components.
///
/// `..` at the root of an absolute path is dropped; leading `..` components of
/// a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Resolve an `upstream` entry relative to the directory of the project that
/// declares it.
pub fn resolve_upstream(project_dir: &Path, upstream: &str) -> PathBuf {
    normalize(&project_dir.join(upstream))
}

/// Express `target` relative to `base`, both normalized. Uses `/` separators
/// so the result can be embedded in generated configuration on any host.
///
/// Returns `None` when the paths do not share a common root (e.g. different
/// drive prefixes or one absolute and one relative).
pub fn relative_to(target: &Path, base: &Path) -> Option<String> {
    let target = normalize(target);
    let base = normalize(base);
    if target.has_root() != base.has_root() {
        return None;
    }

    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (target_parts.first(), base_parts.first())
    {
        if a != b {
            return None;
        }
    }

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for component in &base_parts[common..] {
        if matches!(component, Component::Normal(_)) {
            segments.push("..".to_string());
        }
    }
    for component in &target_parts[common..] {
        segments.push(component.as_os_str().to_string_lossy().into_owned());
    }
    Some(segments.join("/"))
}
