//! Console output formatter for ensemble results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use ensemble_application::MetricsSnapshot;
use ensemble_domain::{EnsembleResult, ResponseStatus, RoleResult};

/// Formats ensemble results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete result
    pub fn format(result: &EnsembleResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Ensemble Results"));
        output.push('\n');
        output.push_str(&Self::summary_line(result));
        output.push('\n');

        if result.is_degraded() {
            output.push_str(&format!(
                "\n{} {}\n",
                "Degraded:".red().bold(),
                result.metadata.error.as_deref().unwrap_or("no provider answered")
            ));
        }

        if !result.roles.is_empty() {
            output.push_str(&Self::section_header("Provider Answers"));
            for role in &result.roles {
                output.push_str(&Self::role_block(role, result.winner()));
            }
        }

        output.push_str(&Self::section_header("Vote"));
        output.push_str(&Self::vote_block(result));

        output.push_str(&Self::section_header("Synthesis"));
        let by = match &result.synthesis.model {
            Some(model) => format!("Synthesized by {}", model),
            None => "Synthesis".to_string(),
        };
        output.push_str(&format!(
            "\n{} ({}, confidence {:.2})\n\n{}\n",
            by.yellow().bold(),
            result.synthesis.status,
            result.synthesis.confidence,
            result.synthesis.content
        ));
        if let Some(err) = &result.synthesis.error {
            output.push_str(&format!("{} {}\n", "Note:".dimmed(), err));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(result: &EnsembleResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format synthesis only (concise output)
    pub fn format_synthesis_only(result: &EnsembleResult) -> String {
        let mut output = String::new();

        if result.is_degraded() {
            output.push_str(&format!(
                "{} {}\n",
                "No answer:".red().bold(),
                result.metadata.error.as_deref().unwrap_or("no provider answered")
            ));
            return output;
        }

        output.push_str(&result.synthesis.content);
        output.push_str("\n\n");
        output.push_str(&Self::summary_line(result).dimmed().to_string());
        output.push('\n');
        if result.quality_unverified() {
            output.push_str(&format!(
                "{}\n",
                "Quality could not be verified after re-querying.".yellow()
            ));
        }
        output
    }

    /// Format a metrics snapshot (`--stats`)
    pub fn format_stats(stats: &MetricsSnapshot) -> String {
        let mut output = Self::section_header("Pipeline Metrics");
        output.push_str(&format!(
            "  requests: {}  cache hits: {} ({:.0}%)  avg time: {:.0}ms\n",
            stats.requests,
            stats.cache_hits,
            stats.cache_hit_rate * 100.0,
            stats.average_processing_ms
        ));
        output.push_str(&format!(
            "  degraded: {}  re-queries: {} ({} accepted)\n",
            stats.degraded, stats.requeries, stats.requeries_accepted
        ));
        let consensus: Vec<String> = stats
            .consensus
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(grade, n)| format!("{}={}", grade, n))
            .collect();
        if !consensus.is_empty() {
            output.push_str(&format!("  consensus: {}\n", consensus.join(" ")));
        }
        let triggers: Vec<String> = stats
            .abstention_triggers
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(reason, n)| format!("{}={}", reason, n))
            .collect();
        if !triggers.is_empty() {
            output.push_str(&format!("  abstention: {}\n", triggers.join(" ")));
        }
        output
    }

    fn summary_line(result: &EnsembleResult) -> String {
        let meta = &result.metadata;
        let mut parts = vec![
            format!("tier {}", meta.tier),
            format!("consensus {}", result.voting.result.consensus),
            format!("{}ms", meta.processing_time_ms),
        ];
        if let Some(winner) = result.winner() {
            parts.insert(1, format!("winner {}", winner));
        }
        if meta.cache_flags.cached {
            match meta.cache_flags.similarity {
                Some(s) if meta.cache_flags.similarity_hit => {
                    parts.push(format!("cached (similar {:.2})", s))
                }
                _ => parts.push("cached".to_string()),
            }
        }
        parts.join(" | ")
    }

    fn role_block(role: &RoleResult, winner: Option<&str>) -> String {
        let marker = if winner == Some(role.role.as_str()) {
            " *"
        } else {
            ""
        };
        let title = format!("── {} ({}){} ──", role.role, role.model, marker);
        match &role.status {
            ResponseStatus::Fulfilled => format!(
                "\n{}\n{} {:.2} ({}) · {}ms\n{}\n",
                title.yellow().bold(),
                "confidence".dimmed(),
                role.confidence.score,
                role.confidence.level,
                role.latency_ms,
                role.content
            ),
            ResponseStatus::Rejected(kind) => format!(
                "\n{}\n{}: {}\n",
                title.red().bold(),
                kind,
                role.error.as_deref().unwrap_or("Unknown")
            ),
        }
    }

    fn vote_block(result: &EnsembleResult) -> String {
        let voting = &result.voting.result;
        let mut output = String::new();
        for (role, weight) in voting.ranked() {
            output.push_str(&format!("  {:<12} {:>5.1}%\n", role, weight * 100.0));
        }
        output.push_str(&format!(
            "  consensus: {}  confidence: {:.2}\n",
            voting.consensus, voting.confidence
        ));
        if let Some(tie) = &voting.tie_breaking {
            output.push_str(&format!(
                "  {} {} -> {} (gap {:.3}): {}\n",
                "tie-break:".cyan(),
                tie.original_winner,
                tie.final_winner,
                tie.gap,
                tie.reasoning
            ));
        }
        if let Some(meta) = &result.voting.meta_voting {
            match (&meta.choice, meta.agrees_with_winner) {
                (Some(choice), Some(agrees)) => output.push_str(&format!(
                    "  meta-vote: {} ({})\n",
                    choice,
                    if agrees { "agrees" } else { "disagrees" }
                )),
                _ => output.push_str(&format!(
                    "  meta-vote: {}\n",
                    meta.error.as_deref().unwrap_or("no verdict")
                )),
            }
        }
        if let Some(report) = &result.voting.abstention
            && report.decision.triggered
        {
            let reasons: Vec<String> = report
                .decision
                .reasons
                .iter()
                .map(|r| r.to_string())
                .collect();
            output.push_str(&format!(
                "  {} {} (attempts {}, accepted {})\n",
                "abstention:".yellow(),
                reasons.join(", "),
                report.attempts,
                report.requery_accepted
            ));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &EnsembleResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &EnsembleResult) -> String {
        Self::format_json(result)
    }

    fn format_synthesis_only(&self, result: &EnsembleResult) -> String {
        Self::format_synthesis_only(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::OutputFormat;

    fn degraded() -> EnsembleResult {
        EnsembleResult::degraded("cid-1", "free", "All providers failed", "2.1.0")
    }

    #[test]
    fn test_degraded_synthesis_only() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_synthesis_only(&degraded());
        assert!(text.contains("No answer: All providers failed"));
    }

    #[test]
    fn test_full_format_mentions_vote_and_synthesis() {
        colored::control::set_override(false);
        let text = ConsoleFormatter.render(OutputFormat::Full, &degraded());
        assert!(text.contains("Vote"));
        assert!(text.contains("Synthesis"));
        assert!(text.contains("consensus none"));
    }

    #[test]
    fn test_json_is_camel_case() {
        let json = ConsoleFormatter.render(OutputFormat::Json, &degraded());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["correlationId"], "cid-1");
        assert_eq!(value["metadata"]["degraded"], true);
        assert!(value["roles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_stats_skip_empty_buckets() {
        colored::control::set_override(false);
        let stats = MetricsSnapshot {
            requests: 4,
            cache_hits: 1,
            cache_hit_rate: 0.25,
            average_processing_ms: 1500.0,
            degraded: 0,
            requeries: 1,
            requeries_accepted: 1,
            consensus: [("strong".to_string(), 3), ("weak".to_string(), 0)]
                .into_iter()
                .collect(),
            abstention_triggers: Default::default(),
        };
        let text = ConsoleFormatter::format_stats(&stats);
        assert!(text.contains("cache hits: 1 (25%)"));
        assert!(text.contains("consensus: strong=3"));
        assert!(!text.contains("weak"));
        assert!(!text.contains("abstention:"));
    }
}
