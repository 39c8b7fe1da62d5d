//! # pixi-devenv
//!
//! Consolidates per-project `pixi.devenv.toml` declarations spread across a
//! multi-project workspace into one `pixi.toml` per starting project. It is
//! used by the `pixi-devenv` command-line tool but can be embedded by anything
//! that needs the merged view of a project and its upstream projects.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use pixi_devenv::loader::{DeclarationCache, MemoryLoader};
//! use pixi_devenv::phases::{consolidate, discovery, ordering};
//!
//! let loader = MemoryLoader::new()
//!     .with("/ws/core", "[devenv]\nname = \"core\"\n[devenv.dependencies]\nattrs = \">=19\"\n")
//!     .with("/ws/calc", "[devenv]\nname = \"calc\"\nupstream = [\"../core\"]\n");
//!
//! let mut cache = DeclarationCache::new();
//! let graph = discovery::execute(Path::new("/ws/calc"), &loader, &mut cache).unwrap();
//! let order = ordering::execute(&graph).unwrap();
//! let project = consolidate::execute(&graph, &order, graph.start(), None).unwrap();
//!
//! let attrs = &project.defaults.base.dependencies["attrs"];
//! assert_eq!(attrs.spec.version.as_str(), ">=19");
//! ```
//!
//! ## Core Concepts
//!
//! - **Declarations (`project`, `loader`)**: the typed form of a
//!   `pixi.devenv.toml` file and the collaborators that load and cache them.
//! - **Versions and platforms (`version`, `platform`)**: conda version ranges
//!   with intersection, platform tags and target selectors.
//! - **Merging (`merge`)**: the rules for combining two specs of one package
//!   and two values of one environment variable.
//! - **Phases (`phases`)**: the pipeline that builds the upstream graph,
//!   orders it, consolidates the starting project and writes `pixi.toml`.
//!
//! ## Execution Flow
//!
//! The main entry point is `phases::orchestrator`, which executes:
//!
//! 1.  **Discovery**: Recursively load all upstream projects.
//! 2.  **Ordering**: Sort them so upstream projects come first.
//! 3.  **Consolidation**: Fold inherited declarations into the starting project.
//! 4.  **Writing**: Render the result into the existing `pixi.toml`.

pub mod error;
pub mod init;
pub mod loader;
pub mod merge;
pub mod output;
pub mod path;
pub mod phases;
pub mod platform;
pub mod project;
pub mod version;

#[cfg(test)]
mod version_proptest;
