//! Presentation-level configuration

use ensemble_domain::OutputFormat;

/// How results are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: bool,
    pub show_progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            color: true,
            show_progress: true,
        }
    }
}

impl OutputConfig {
    /// The command line wins over the file. `--quiet` hides progress.
    pub fn merge(
        cli_format: Option<OutputFormat>,
        quiet: bool,
        file_format: Option<OutputFormat>,
        file_color: bool,
        file_progress: bool,
    ) -> Self {
        let format = cli_format.or(file_format).unwrap_or_default();
        Self {
            format,
            color: file_color,
            // JSON goes to pipes; keep stdout clean
            show_progress: file_progress && !quiet && format != OutputFormat::Json,
        }
    }
}
