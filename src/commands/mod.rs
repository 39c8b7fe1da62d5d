//! # CLI Command Implementations
//!
//! Each subcommand of `pixi-devenv` lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `pixi_devenv` library.

pub mod init;
pub mod show;
pub mod update;

use std::collections::BTreeSet;

use pixi_devenv::error::Error;
use pixi_devenv::output::OutputConfig;
use pixi_devenv::platform::Platform;

/// Render a failure as a single `error[<kind>]: <message>` line.
///
/// Library errors report the kind of their root cause; the message still
/// names the project that was being processed.
pub fn report(output: &OutputConfig, error: &anyhow::Error) -> String {
    match error.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(library) => output.error_line(library.root_cause().kind(), &library.to_string()),
        None => output.error_line("error", &format!("{:#}", error)),
    }
}

/// `None` when no `--platform` was given, so resolution applies.
fn platform_override(platforms: &[Platform]) -> Option<BTreeSet<Platform>> {
    if platforms.is_empty() {
        None
    } else {
        Some(platforms.iter().copied().collect())
    }
}
