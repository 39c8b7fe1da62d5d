//! # Error Handling
//!
//! This module defines the centralized error type for `pixi-devenv`. Every
//! failure the library can produce is a variant of [`Error`], built with
//! `thiserror` so each one renders a descriptive message.
//!
//! ## Taxonomy
//!
//! - **`Schema`**: a declaration is malformed or misses a required field.
//! - **`NotFound`**: an upstream location, allowlist entry or feature name
//!   cannot be resolved.
//! - **`Cycle`**: the upstream relation is not acyclic. Carries the full path.
//! - **`DuplicateProject`**: two distinct locations declare the same name.
//! - **`ConstraintConflict`**: two merged version ranges do not intersect.
//! - **`SpecFieldConflict`**: two merged specs disagree on `build`/`channel`.
//! - **`Consolidation`**: wraps any of the above with the name of the project
//!   being processed when it happened.
//!
//! All of these are deterministic input-data errors: nothing is retried and no
//! partial output is produced.

use std::path::PathBuf;

use thiserror::Error;

use crate::project::ProjectName;

/// Main error type for pixi-devenv operations
#[derive(Error, Debug)]
pub enum Error {
    /// A declaration is malformed, misses a required field or uses an unknown
    /// platform tag.
    #[error("Schema error in {}: {message}", location.display())]
    Schema { location: PathBuf, message: String },

    /// A reference could not be resolved.
    ///
    /// Optionally carries a hint about how to fix it.
    #[error("Not found: {reference}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    NotFound {
        reference: String,
        message: String,
        /// Optional hint for how to resolve the missing reference
        hint: Option<String>,
    },

    /// The upstream graph contains a cycle.
    #[error("Upstream projects are in a cycle: {}", format_cycle(cycle))]
    Cycle { cycle: Vec<ProjectName> },

    /// Two distinct locations declare the same project name.
    #[error("Duplicate project '{name}' declared in {} and {}", first.display(), second.display())]
    DuplicateProject {
        name: ProjectName,
        first: PathBuf,
        second: PathBuf,
    },

    /// Two version ranges for the same package have an empty intersection.
    #[error("Conflicting version constraints for {package}: '{left}' and '{right}' (from {})", sources.join(", "))]
    ConstraintConflict {
        package: String,
        left: String,
        right: String,
        sources: Vec<String>,
    },

    /// Two specs for the same package declare different `build` or `channel`.
    #[error("Conflicting {field}s declared for {package}: '{left}' and '{right}'")]
    SpecFieldConflict {
        package: String,
        field: &'static str,
        left: String,
        right: String,
    },

    /// Scaffolding refused to overwrite an existing file.
    #[error("{} already exists, aborting", path.display())]
    AlreadyExists { path: PathBuf },

    /// Any other error, annotated with the project being processed.
    #[error("In project '{project}': {source}")]
    Consolidation {
        project: ProjectName,
        #[source]
        source: Box<Error>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// An error parsing a document for in-place editing.
    #[error("TOML document error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Annotate this error with the project that was being processed.
    ///
    /// Errors that already carry a project are returned as they are.
    pub fn in_project(self, project: &ProjectName) -> Self {
        match self {
            Error::Consolidation { .. } => self,
            other => Error::Consolidation {
                project: project.clone(),
                source: Box::new(other),
            },
        }
    }

    /// Short stable name of the error kind, used in CLI diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Schema { .. } => "schema",
            Error::NotFound { .. } => "not-found",
            Error::Cycle { .. } => "cycle",
            Error::DuplicateProject { .. } => "duplicate-project",
            Error::ConstraintConflict { .. } => "constraint-conflict",
            Error::SpecFieldConflict { .. } => "spec-conflict",
            Error::AlreadyExists { .. } => "already-exists",
            Error::Consolidation { .. } => "consolidation",
            Error::Io(_) => "io",
            Error::TomlParse(_) | Error::TomlEdit(_) => "toml",
            Error::Json(_) => "json",
        }
    }

    /// The innermost error, skipping `Consolidation` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Consolidation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn format_cycle(cycle: &[ProjectName]) -> String {
    cycle
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
