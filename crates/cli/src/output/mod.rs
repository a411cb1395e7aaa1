//! Output configuration and formatting

mod formatter;

pub use formatter::Formatter;

/// Global output switches shared by all commands
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Print a JSON summary instead of progress lines
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Suppress progress lines; errors are still printed
    pub quiet: bool,
}
