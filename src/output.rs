//! # Output Configuration
//!
//! Controls how progress messages look on the terminal. Messages carry a
//! short marker per pipeline step; the marker is an emoji when the terminal
//! supports color and a bracketed tag otherwise.
//!
//! The `--color` flag and the usual environment conventions decide:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// Anything other than "always" or "never" is treated as "auto".
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Create a configuration with plain-text markers only.
    pub fn plain() -> Self {
        Self { use_color: false }
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
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Pipeline step a progress message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Fetch,
    Summary,
    Generate,
    Cleanup,
    Keep,
    Stop,
    Done,
}

impl Marker {
    /// The marker text for the given configuration.
    pub fn render(self, config: &OutputConfig) -> &'static str {
        let (emoji, plain) = match self {
            Marker::Fetch => ("🔍", "[FETCH]"),
            Marker::Summary => ("📋", "[FILES]"),
            Marker::Generate => ("📚", "[DOCFX]"),
            Marker::Cleanup => ("🧹", "[CLEAN]"),
            Marker::Keep => ("📁", "[KEEP]"),
            Marker::Stop => ("🛑", "[STOP]"),
            Marker::Done => ("✅", "[DONE]"),
        };
        if config.use_color {
            emoji
        } else {
            plain
        }
    }
}
