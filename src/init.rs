//! Scaffolding of a new devenv project
//!
//! Creates a starter `pixi.devenv.toml` and an empty `pixi.toml` in a
//! directory. Existing files are never overwritten.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::phases::write::PIXI_FILE;
use crate::project::DEVENV_FILE;

const PYTHON_SOURCE_DIR: &str = "source/python";
const DEFAULT_SOURCE_DIR: &str = "src";

const PIXI_TEMPLATE: &str = "[workspace]\n\n[environments]\n";

/// Write the starter files into `dir`.
///
/// Fails with [`Error::AlreadyExists`] before writing anything when either
/// file is already present.
pub fn execute(dir: &Path) -> Result<()> {
    let devenv = dir.join(DEVENV_FILE);
    let pixi = dir.join(PIXI_FILE);
    for path in [&devenv, &pixi] {
        if path.is_file() {
            return Err(Error::AlreadyExists { path: path.clone() });
        }
    }

    let source_dir = if dir.join(PYTHON_SOURCE_DIR).is_dir() {
        PYTHON_SOURCE_DIR
    } else {
        DEFAULT_SOURCE_DIR
    };
    debug!("Scaffolding {} with PYTHONPATH at {}", dir.display(), source_dir);

    fs::write(&devenv, devenv_template(source_dir))?;
    fs::write(&pixi, PIXI_TEMPLATE)?;
    Ok(())
}

fn devenv_template(source_dir: &str) -> String {
    format!(
        r#"[devenv]
channels = [
    "conda-forge",
]
platforms = ["win-64", "linux-64"]

[devenv.dependencies]

[devenv.env-vars]
PYTHONPATH = ["${{{{ devenv_project_dir }}}}/{source_dir}"]
"#
    )
}
