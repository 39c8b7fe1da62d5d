//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::commands;
use pixi_devenv::output::OutputConfig;

/// pixi-devenv - Consolidate pixi.devenv.toml declarations into pixi.toml
#[derive(Parser, Debug)]
#[command(name = "pixi-devenv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Consolidate the project declarations and update pixi.toml
    Update(commands::update::UpdateArgs),

    /// Print the consolidated project as JSON
    Show(commands::show::ShowArgs),

    /// Create starter pixi.devenv.toml and pixi.toml files
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Output styling selected by `--color` and the environment.
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(Env::default().default_filter_or(self.log_level.as_str()))
            .format_timestamp(None)
            .init();
        let output = self.output_config();

        match self.command {
            Commands::Update(args) => commands::update::execute(args, &output),
            Commands::Show(args) => commands::show::execute(args),
            Commands::Init(args) => commands::init::execute(args, &output),
        }
    }
}
