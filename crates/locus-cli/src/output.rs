//! Status output on stderr; results go to stdout untouched

use console::{style, Term};

/// Prints status lines with optional color
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Printer {
    /// Create a new printer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an informational message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Dim a secondary value when colors are on
    #[must_use]
    pub fn dim(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }

    /// Highlight a primary value when colors are on
    #[must_use]
    pub fn bold(&self, text: &str) -> String {
        if self.use_color {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }
}
