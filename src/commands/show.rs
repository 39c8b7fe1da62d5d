//! Show command implementation
//!
//! Prints the consolidated project of a directory as JSON without touching
//! `pixi.toml`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pixi_devenv::loader::{DeclarationCache, FileLoader};
use pixi_devenv::phases::orchestrator;
use pixi_devenv::platform::Platform;

use super::platform_override;

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project directory
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Consolidate for this platform instead of the resolved ones (repeatable)
    #[arg(long = "platform", value_name = "PLATFORM")]
    pub platforms: Vec<Platform>,
}

/// Execute the show command
pub fn execute(args: ShowArgs) -> Result<()> {
    println!("{}", render(&args)?);
    Ok(())
}

fn render(args: &ShowArgs) -> Result<String> {
    let project = orchestrator::consolidate_directory(
        &args.dir,
        &FileLoader::new(),
        &mut DeclarationCache::new(),
        platform_override(&args.platforms).as_ref(),
    )?;
    Ok(serde_json::to_string_pretty(&project)?)
}
