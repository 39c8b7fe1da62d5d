//! # pixi-devenv CLI
//!
//! This is the binary entry point for the `pixi-devenv` command-line tool.
//!
//! It parses arguments with `clap`, runs the selected command and turns any
//! failure into an `error[<kind>]: <message>` line on stderr with a non-zero
//! exit code. The consolidation logic lives in the library crate.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let output = cli.output_config();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", commands::report(&output, &error));
            ExitCode::FAILURE
        }
    }
}
