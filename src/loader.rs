//! # Declaration Loading
//!
//! The graph builder never reads files itself. It asks a [`Loader`] for the
//! declaration at a location and memoizes the result in a caller-owned
//! [`DeclarationCache`], so building a graph is a pure function of the loader
//! and the cache handed to it.
//!
//! ## Implementations
//!
//! - **`FileLoader`**: reads `<dir>/pixi.devenv.toml` from disk. When the file
//!   does not declare a `name`, the directory name is used.
//! - **`MemoryLoader`**: serves declarations from an in-memory map of location
//!   to TOML text. Used by tests and by embedders that already hold the files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::trace;

use crate::error::{Error, Result};
use crate::path::normalize;
use crate::project::{parse, Project, RawDeclaration, DEVENV_FILE};

/// Source of project declarations.
///
/// `location` is a normalized project directory.
pub trait Loader {
    fn load(&self, location: &Path) -> Result<RawDeclaration>;
}

/// Loads `pixi.devenv.toml` files from the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Loader for FileLoader {
    fn load(&self, location: &Path) -> Result<RawDeclaration> {
        let file = location.join(DEVENV_FILE);
        if !file.is_file() {
            return Err(Error::NotFound {
                reference: file.display().to_string(),
                message: format!("{} not found", DEVENV_FILE),
                hint: Some("Check the upstream path or run `pixi-devenv init`".to_string()),
            });
        }

        let content = fs::read_to_string(&file)?;
        let mut raw = parse(&content, &file)?;
        if raw.name.is_none() {
            raw.name = directory_name(location);
        }
        Ok(raw)
    }
}

fn directory_name(location: &Path) -> Option<String> {
    let absolute = if location.is_absolute() {
        location.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(location)
    };
    normalize(&absolute)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Serves declarations from memory, keyed by normalized location.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the TOML text of the declaration at `location`.
    pub fn add(&mut self, location: impl AsRef<Path>, content: &str) -> &mut Self {
        self.files
            .insert(normalize(location.as_ref()), content.to_string());
        self
    }

    /// Builder-style variant of [`MemoryLoader::add`].
    pub fn with(mut self, location: impl AsRef<Path>, content: &str) -> Self {
        self.add(location, content);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, location: &Path) -> Result<RawDeclaration> {
        let content = self.files.get(location).ok_or_else(|| Error::NotFound {
            reference: location.display().to_string(),
            message: "no declaration at this location".to_string(),
            hint: None,
        })?;
        parse(content, location)
    }
}

/// Caller-owned memo of validated projects keyed by normalized location.
///
/// Reusing a cache across several builds avoids reloading shared upstream
/// projects. Entries are immutable once inserted.
#[derive(Debug, Default, Clone)]
pub struct DeclarationCache {
    projects: HashMap<PathBuf, Arc<Project>>,
}

impl DeclarationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the project at `location`, loading and validating it on a miss.
    pub fn get_or_load(&mut self, location: &Path, loader: &dyn Loader) -> Result<Arc<Project>> {
        let location = normalize(location);
        if let Some(project) = self.projects.get(&location) {
            trace!("Declaration cache hit for {}", location.display());
            return Ok(Arc::clone(project));
        }

        let raw = loader.load(&location)?;
        let project = Arc::new(Project::from_raw(raw, &location)?);
        self.projects.insert(location, Arc::clone(&project));
        Ok(project)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingLoader {
        inner: MemoryLoader,
        calls: Cell<usize>,
    }

    impl Loader for CountingLoader {
        fn load(&self, location: &Path) -> Result<RawDeclaration> {
            self.calls.set(self.calls.get() + 1);
            self.inner.load(location)
        }
    }

    #[test]
    fn test_memory_loader_missing_location() {
        let loader = MemoryLoader::new();
        let error = loader.load(Path::new("/ws/none")).unwrap_err();
        assert!(matches!(error, Error::NotFound { .. }));
    }

    #[test]
    fn test_memory_loader_normalizes_keys() {
        let loader = MemoryLoader::new().with("/ws/a/../core", "[devenv]\nname = \"core\"\n");
        let raw = loader.load(Path::new("/ws/core")).unwrap();
        assert_eq!(raw.name.as_deref(), Some("core"));
    }

    #[test]
    fn test_cache_loads_once() {
        let loader = CountingLoader {
            inner: MemoryLoader::new().with("/ws/core", "[devenv]\nname = \"core\"\n"),
            calls: Cell::new(0),
        };
        let mut cache = DeclarationCache::new();

        let first = cache.get_or_load(Path::new("/ws/core"), &loader).unwrap();
        let second = cache.get_or_load(Path::new("/ws/./core"), &loader).unwrap();

        assert_eq!(loader.calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_file_loader_derives_name_from_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("calc");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DEVENV_FILE), "[devenv]\nchannels = [\"conda-forge\"]\n").unwrap();

        let raw = FileLoader::new().load(&dir).unwrap();
        assert_eq!(raw.name.as_deref(), Some("calc"));
        assert_eq!(raw.channels, ["conda-forge"]);
    }

    #[test]
    fn test_file_loader_explicit_name_wins() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(DEVENV_FILE),
            "[devenv]\nname = \"explicit\"\n",
        )
        .unwrap();

        let raw = FileLoader::new().load(temp.path()).unwrap();
        assert_eq!(raw.name.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_file_loader_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let error = FileLoader::new().load(temp.path()).unwrap_err();
        assert!(matches!(error, Error::NotFound { .. }));
        assert!(error.to_string().contains(DEVENV_FILE));
    }
}
