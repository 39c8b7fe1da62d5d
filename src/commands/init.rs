//! # Init Command Implementation
//!
//! Creates starter `pixi.devenv.toml` and `pixi.toml` files. Existing files
//! are never overwritten.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pixi_devenv::init;
use pixi_devenv::output::OutputConfig;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, output: &OutputConfig) -> Result<()> {
    init::execute(&args.dir)?;
    println!(
        "{}",
        output.status_line("Created", format!("pixi.devenv.toml and pixi.toml in {}", args.dir.display()))
    );
    println!("Run `pixi-devenv update` after declaring dependencies");
    Ok(())
}
