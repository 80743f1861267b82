//! # Terminal Output
//!
//! Controls how the `strata` CLI decorates its output. Colors and status
//! symbols are used only when the terminal and the user allow it.
//!
//! Color is decided by the `--color=always|never|auto` flag. In `auto` mode
//! it is disabled by `NO_COLOR` (any value), `CLICOLOR=0`, `TERM=dumb` or a
//! non-TTY stdout, and forced on by `CLICOLOR_FORCE=1`.

use std::env;

use console::style;

/// Output settings shared by every command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => detect_color_support(),
        };
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

fn detect_color_support() -> bool {
    // https://no-color.org/: presence alone disables colors
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

/// Outcome markers printed in front of report lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Error,
    Remote,
    Local,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Status::Ok => "✔",
            Status::Warning => "⚠",
            Status::Error => "✖",
            Status::Remote => "⇡",
            Status::Local => "●",
        }
    }

    fn plain(self) -> &'static str {
        match self {
            Status::Ok => "[OK]",
            Status::Warning => "[WARN]",
            Status::Error => "[ERROR]",
            Status::Remote => "[REMOTE]",
            Status::Local => "[LOCAL]",
        }
    }

    /// The marker for this status under `config`
    pub fn marker(self, config: &OutputConfig) -> String {
        if !config.use_color {
            return self.plain().to_string();
        }
        let symbol = style(self.symbol());
        match self {
            Status::Ok => symbol.green().to_string(),
            Status::Warning => symbol.yellow().to_string(),
            Status::Error => symbol.red().bold().to_string(),
            Status::Remote => symbol.cyan().to_string(),
            Status::Local => symbol.dim().to_string(),
        }
    }
}

/// Render `text` bold when colors are enabled
pub fn emphasis(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).bold().to_string()
    } else {
        text.to_string()
    }
}

/// Render `text` dimmed when colors are enabled
pub fn muted(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).dim().to_string()
    } else {
        text.to_string()
    }
}
