//! Update command implementation
//!
//! Runs the full pipeline for every requested directory:
//! 1. Discovery of upstream projects
//! 2. Ordering upstream-first
//! 3. Consolidation of the starting project
//! 4. Rendering into `pixi.toml`
//!
//! Several directories are updated in parallel and share loaded declarations.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pixi_devenv::output::OutputConfig;
use pixi_devenv::phases::orchestrator::{self, UpdateOptions};
use pixi_devenv::phases::write::PIXI_FILE;
use pixi_devenv::platform::Platform;

use super::{platform_override, report};

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Project directories to update
    #[arg(value_name = "DIR", default_value = ".")]
    pub dirs: Vec<PathBuf>,

    /// Print the rendered pixi.toml instead of writing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Consolidate for this platform instead of the resolved ones (repeatable)
    #[arg(long = "platform", value_name = "PLATFORM")]
    pub platforms: Vec<Platform>,
}

/// Execute the update command
pub fn execute(args: UpdateArgs, output: &OutputConfig) -> Result<()> {
    let options = UpdateOptions {
        platforms: platform_override(&args.platforms),
        dry_run: args.dry_run,
    };

    let results = orchestrator::update_directories(&args.dirs, &options);
    let total = results.len();
    let mut failures = Vec::new();

    for (dir, result) in args.dirs.iter().zip(results) {
        match result {
            Ok(rendered) if args.dry_run => print!("{}", rendered),
            Ok(_) => println!("{}", output.status_line("Updated", dir.join(PIXI_FILE).display())),
            Err(error) => failures.push(error),
        }
    }

    match failures.len() {
        0 => Ok(()),
        1 if total == 1 => Err(failures.remove(0).into()),
        failed => {
            for error in failures {
                eprintln!("{}", report(output, &anyhow::Error::from(error)));
            }
            anyhow::bail!("{} of {} directories failed", failed, total)
        }
    }
}
