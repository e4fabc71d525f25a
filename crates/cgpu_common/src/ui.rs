//! Terminal styling for the status report.
//!
//! Every code accessor renders as an empty string when styling is off, so
//! styled and plain output carry identical text.

use std::env;
use std::io::IsTerminal;

/// Horizontal rule framing the report.
pub const RULE: &str = "=======================================";

/// Styling switch, detected once per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    pub color: bool,
}

impl Style {
    /// Detect styling from the environment: color only on a TTY with
    /// `NO_COLOR` unset.
    pub fn detect() -> Self {
        if env::var_os("NO_COLOR").is_some() {
            return Style { color: false };
        }
        Style {
            color: std::io::stdout().is_terminal(),
        }
    }

    /// Styling forced off.
    pub fn plain() -> Self {
        Style { color: false }
    }

    /// Styling forced on, regardless of the terminal.
    pub fn colored() -> Self {
        Style { color: true }
    }

    pub fn green(&self) -> &'static str {
        self.code("\x1b[32m")
    }

    pub fn yellow(&self) -> &'static str {
        self.code("\x1b[33m")
    }

    pub fn red(&self) -> &'static str {
        self.code("\x1b[31m")
    }

    pub fn cyan(&self) -> &'static str {
        self.code("\x1b[36m")
    }

    pub fn magenta(&self) -> &'static str {
        self.code("\x1b[35m")
    }

    pub fn white(&self) -> &'static str {
        self.code("\x1b[37m")
    }

    pub fn bold(&self) -> &'static str {
        self.code("\x1b[1m")
    }

    pub fn reset(&self) -> &'static str {
        self.code("\x1b[0m")
    }

    fn code(&self, code: &'static str) -> &'static str {
        if self.color {
            code
        } else {
            ""
        }
    }
}

/// Availability check mark; ASCII on Windows consoles.
pub fn check_mark() -> &'static str {
    if cfg!(windows) {
        "[OK]"
    } else {
        "✓"
    }
}

/// Availability cross mark; ASCII on Windows consoles.
pub fn cross_mark() -> &'static str {
    if cfg!(windows) {
        "[X]"
    } else {
        "✗"
    }
}
