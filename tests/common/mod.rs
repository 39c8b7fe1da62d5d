//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_project("app", "[devenv]\n");
//!     // ... test code
//! }
//! ```

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::declarations;
    pub use super::TestFixture;
}

/// Declaration snippets shared by several tests.
#[allow(dead_code)]
pub mod declarations {
    /// A base project with a Windows-only dependency.
    pub const CORE: &str = r#"[devenv]
channels = ["conda-forge"]

[devenv.dependencies]
attrs = "*"

[devenv.target.win.dependencies]
pywin32 = "*"
"#;

    /// Depends on `core`, Linux only.
    pub const CALC: &str = r#"[devenv]
upstream = ["../core"]
platforms = ["linux-64"]
"#;

    /// Two projects referencing each other.
    pub const CYCLE_A: &str = "[devenv]\nupstream = [\"../b\"]\n";
    pub const CYCLE_B: &str = "[devenv]\nupstream = [\"../a\"]\n";
}

/// Path of the checked-in sample workspace.
#[allow(dead_code)]
pub fn sample_workspace() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/workspace")
}

/// A temporary workspace of project directories.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_project("core", declarations::CORE)
///     .with_project("calc", declarations::CALC);
///
/// let mut cmd = cargo_bin_cmd!("pixi-devenv");
/// cmd.current_dir(fixture.project("calc"))
///     .arg("update")
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a fixture holding a copy of the sample workspace.
    pub fn sample() -> Self {
        let fixture = Self::new();
        fixture
            .temp_dir
            .copy_from(sample_workspace(), &["**"])
            .expect("Failed to copy sample workspace");
        fixture
    }

    /// Add a project directory with a `pixi.devenv.toml` and a minimal `pixi.toml`.
    pub fn with_project(self, name: &str, declaration: &str) -> Self {
        self.with_file(&format!("{}/pixi.devenv.toml", name), declaration)
            .with_file(&format!("{}/pixi.toml", name), "[workspace]\n")
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the directory of a project.
    pub fn project(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Read the `pixi.toml` of a project.
    pub fn pixi_toml(&self, name: &str) -> String {
        std::fs::read_to_string(self.project(name).join("pixi.toml"))
            .expect("Failed to read pixi.toml")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
