//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also renders sync progress as log groups and
//! progress bars.

mod formatter;
mod progress;
mod reporter;

pub use formatter::Formatter;
pub use progress::ProgressBar;
pub use reporter::Reporter;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
    /// Running inside a GitHub Actions workflow
    pub github_actions: bool,
}

impl OutputConfig {
    /// Detect the CI environment from `GITHUB_ACTIONS`
    pub fn detect_github_actions() -> bool {
        std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
    }

    /// Whether progress bars must stay hidden
    pub fn is_silent(&self) -> bool {
        self.quiet || self.json || self.no_progress
    }
}
