//! Output formatter trait

use ensemble_domain::{EnsembleResult, OutputFormat};

/// Trait for formatting ensemble results
pub trait OutputFormatter {
    /// Format the complete result: synthesis, provider answers and vote
    fn format(&self, result: &EnsembleResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &EnsembleResult) -> String;

    /// Format synthesis only (concise output)
    fn format_synthesis_only(&self, result: &EnsembleResult) -> String;

    fn render(&self, format: OutputFormat, result: &EnsembleResult) -> String {
        match format {
            OutputFormat::Full => self.format(result),
            OutputFormat::Synthesis => self.format_synthesis_only(result),
            OutputFormat::Json => self.format_json(result),
        }
    }
}
