//! # Output Configuration
//!
//! Controls how the CLI prints per-file status lines.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use console::style;
use std::env;

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

/// Outcome of one file in a command, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Committed,
    Orphaned,
    Unchanged,
    Failed,
    Tagged,
}

impl FileStatus {
    fn label(&self) -> &'static str {
        match self {
            FileStatus::Committed => "committed",
            FileStatus::Orphaned => "committed (index pending)",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Failed => "failed",
            FileStatus::Tagged => "tagged",
        }
    }
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is one of "always", "never" or "auto"; anything else is
    /// treated as "auto".
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
        console::Term::stdout().features().colors_supported()
    }

    /// Formats `status` for `file` as a single line.
    pub fn status_line(&self, status: FileStatus, file: &str) -> String {
        let label = format!("{:>9}", status.label());
        if !self.use_color {
            return format!("{} {}", label, file);
        }
        let styled = match status {
            FileStatus::Committed | FileStatus::Tagged => style(label).green(),
            FileStatus::Orphaned => style(label).yellow(),
            FileStatus::Unchanged => style(label).dim(),
            FileStatus::Failed => style(label).red().bold(),
        };
        format!("{} {}", styled.force_styling(true), file)
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
