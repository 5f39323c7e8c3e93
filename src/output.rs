//! # Output Configuration
//!
//! Controls how the command line decorates human-readable output. Build
//! output (YAML) is never decorated; only status lines from `validate`,
//! `create` and `edit` are.
//!
//! The following are respected:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a terminal
//! - `TERM=dumb` disables colors
//!
//! ```
//! use overkube::output::{marker, OutputConfig, Status};
//!
//! let out = OutputConfig::from_env_and_flag("never");
//! assert_eq!(marker(&out, Status::Ok), "[OK]");
//! ```

use std::env;

use console::Style;

/// Output configuration for controlling colors and symbols.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and symbols should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from the environment and the value of
    /// `--color` ("always", "never" or "auto").
    ///
    /// `always` wins over `NO_COLOR`. In auto mode colors are used only when
    /// the environment allows them and stdout is a color terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables, even when empty.
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

    /// Whether `color_flag` is a recognized `--color` value.
    pub fn is_valid_flag(color_flag: &str) -> bool {
        matches!(
            color_flag.to_lowercase().as_str(),
            "always" | "never" | "auto"
        )
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Scan,
    Ok,
    Warn,
    Error,
    Info,
}

/// The leading marker for a status line: a colored symbol, or a plain tag
/// when colors are off.
pub fn marker(config: &OutputConfig, status: Status) -> String {
    let (symbol, plain, style) = match status {
        Status::Scan => ("🔍", "[SCAN]", Style::new().cyan()),
        Status::Ok => ("✅", "[OK]", Style::new().green()),
        Status::Warn => ("⚠️", "[WARN]", Style::new().yellow()),
        Status::Error => ("❌", "[ERR]", Style::new().red().bold()),
        Status::Info => ("📊", "[INFO]", Style::new().blue()),
    };
    if config.use_color {
        style.apply_to(symbol).force_styling(true).to_string()
    } else {
        plain.to_string()
    }
}

/// Returns `emoji_str` when colors are enabled and `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
