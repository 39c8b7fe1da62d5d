//! # Output Configuration
//!
//! Controls how the CLI styles what it prints, based on terminal capabilities
//! and user preferences.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```
//! use pixi_devenv::error::Error;
//! use pixi_devenv::output::OutputConfig;
//!
//! let config = OutputConfig::from_env_and_flag("never");
//! let error = Error::Cycle { cycle: vec!["a".into(), "b".into(), "a".into()] };
//! assert_eq!(
//!     config.error_line(error.kind(), &error.to_string()),
//!     "error[cycle]: Upstream projects are in a cycle: a -> b -> a"
//! );
//! ```

use std::env;
use std::fmt::Display;

use console::Style;

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stderr is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    /// Format a diagnostic line: `error[<kind>]: <message>`.
    pub fn error_line(&self, kind: &str, message: &str) -> String {
        let label = format!("error[{}]", kind);
        format!("{}: {}", self.paint(Style::new().red().bold(), label), message)
    }

    /// Format a status line such as `Updated <path>`.
    pub fn status_line(&self, verb: &str, subject: impl Display) -> String {
        format!("{} {}", self.paint(Style::new().green().bold(), verb), subject)
    }

    fn paint(&self, style: Style, text: impl Display) -> String {
        style
            .force_styling(self.use_color)
            .apply_to(text)
            .to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
