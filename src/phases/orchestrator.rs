//! Orchestrator for the complete update operation
//!
//! This module coordinates all phases to provide a clean API for consolidating
//! a project directory and writing its `pixi.toml`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::info;
use rayon::prelude::*;

use super::consolidate::ConsolidatedProject;
use super::{consolidate, discovery, ordering, write, Graph};
use crate::error::{Error, Result};
use crate::loader::{DeclarationCache, FileLoader, Loader};
use crate::platform::Platform;
use crate::project::DEVENV_FILE;

/// Options shared by the consolidating entry points.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Platforms to consolidate for instead of the resolved ones.
    pub platforms: Option<BTreeSet<Platform>>,
    /// Render without writing `pixi.toml`.
    pub dry_run: bool,
}

/// Run discovery, ordering and consolidation for the project in `dir`.
///
/// This orchestrates the inheritance pipeline:
/// 1. Build the upstream graph (loading through `cache`)
/// 2. Order it upstream-first
/// 3. Consolidate the starting project
pub fn consolidate_directory(
    dir: &Path,
    loader: &dyn Loader,
    cache: &mut DeclarationCache,
    platforms: Option<&BTreeSet<Platform>>,
) -> Result<ConsolidatedProject> {
    let dir = absolute(dir)?;

    // Phase 1: Discovery
    let graph = discovery::execute(&dir, loader, cache)?;

    consolidate_graph(&graph, platforms)
}

/// Order and consolidate an already discovered graph for its starting project.
///
/// Needs no cache, so any number of these may run concurrently.
pub fn consolidate_graph(
    graph: &Graph,
    platforms: Option<&BTreeSet<Platform>>,
) -> Result<ConsolidatedProject> {
    // Phase 2: Ordering
    let order = ordering::execute(graph)?;

    // Phase 3: Consolidation
    consolidate::execute(graph, &order, graph.start(), platforms)
}

/// Consolidate the project in `dir` and update its `pixi.toml`.
///
/// Returns the rendered document. With `dry_run` nothing is written.
pub fn update_directory(
    dir: &Path,
    loader: &dyn Loader,
    cache: &mut DeclarationCache,
    options: &UpdateOptions,
) -> Result<String> {
    let dir = absolute(dir)?;
    require_files(&dir)?;
    let project = consolidate_directory(&dir, loader, cache, options.platforms.as_ref())?;
    finish(&dir, &project, options.dry_run)
}

/// [`update_directory`] with a fresh cache and the filesystem loader.
pub fn update(dir: &Path, options: &UpdateOptions) -> Result<String> {
    update_directory(dir, &FileLoader::new(), &mut DeclarationCache::new(), options)
}

/// Update several directories in parallel.
///
/// Declarations are shared through one cache behind a lock, so an upstream
/// project common to several directories is loaded once. The lock is held
/// during discovery only. Results are returned in the order of `dirs`.
pub fn update_directories(dirs: &[PathBuf], options: &UpdateOptions) -> Vec<Result<String>> {
    let loader = FileLoader::new();
    let cache = Mutex::new(DeclarationCache::new());

    dirs.par_iter()
        .map(|dir| {
            let dir = absolute(dir)?;
            require_files(&dir)?;
            let graph = discover_shared(&dir, &loader, &cache)?;
            let project = consolidate_graph(&graph, options.platforms.as_ref())?;
            finish(&dir, &project, options.dry_run)
        })
        .collect()
}

fn discover_shared(dir: &Path, loader: &dyn Loader, cache: &Mutex<DeclarationCache>) -> Result<Graph> {
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    discovery::execute(dir, loader, &mut cache)
}

// Phase 4: Writing
fn finish(dir: &Path, project: &ConsolidatedProject, dry_run: bool) -> Result<String> {
    if dry_run {
        let existing = fs::read_to_string(dir.join(write::PIXI_FILE))?;
        return write::render(&existing, project);
    }
    let rendered = write::execute(dir, project)?;
    info!("Updated {}", dir.join(write::PIXI_FILE).display());
    Ok(rendered)
}

fn require_files(dir: &Path) -> Result<()> {
    require_file(dir, DEVENV_FILE)?;
    require_file(dir, write::PIXI_FILE)
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

fn require_file(dir: &Path, name: &str) -> Result<()> {
    let file = dir.join(name);
    if file.is_file() {
        return Ok(());
    }
    Err(Error::NotFound {
        reference: file.display().to_string(),
        message: format!("{} not found in {}", name, dir.display()),
        hint: Some("Consider running `pixi-devenv init`".to_string()),
    })
}
