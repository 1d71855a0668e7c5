//! Progress reporting for ensemble runs

use colored::Colorize;
use ensemble_application::{EnsemblePhase, ProgressNotifier};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with an indicatif bar per phase
pub struct ProgressReporter {
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            phase_bar: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    pub fn phase_display_name(phase: EnsemblePhase) -> &'static str {
        match phase {
            EnsemblePhase::Dispatch => "Asking providers",
            EnsemblePhase::Voting => "Voting",
            EnsemblePhase::Synthesis => "Synthesizing",
            EnsemblePhase::Abstention => "Checking quality",
            EnsemblePhase::Requery => "Re-querying",
        }
    }

    fn replace_bar(&self, bar: Option<ProgressBar>) -> Option<ProgressBar> {
        match self.phase_bar.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, bar),
            Err(_) => None,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: EnsemblePhase, total_tasks: usize) {
        let pb = if total_tasks > 1 {
            let pb = ProgressBar::new(total_tasks as u64);
            pb.set_style(Self::bar_style());
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb
        };
        pb.set_prefix(Self::phase_display_name(phase));
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = self.replace_bar(Some(pb)) {
            previous.finish_and_clear();
        }
    }

    fn on_provider_complete(&self, role: &str, success: bool, latency_ms: u64) {
        if let Ok(guard) = self.phase_bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            let status = if success {
                format!("{} {} ({}ms)", "v".green(), role, latency_ms)
            } else {
                format!("{} {}", "x".red(), role)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, phase: EnsemblePhase) {
        if let Some(pb) = self.replace_bar(None) {
            pb.finish_with_message(format!("{} done", phase.as_str().green()));
        }
    }

    fn on_cache_hit(&self, similarity: f64) {
        if let Some(pb) = self.replace_bar(None) {
            pb.finish_and_clear();
        }
        eprintln!(
            "{} answered from cache (similarity {:.2})",
            "v".green(),
            similarity
        );
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: EnsemblePhase, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::phase_display_name(phase).bold(),
            total_tasks
        );
    }

    fn on_provider_complete(&self, role: &str, success: bool, latency_ms: u64) {
        if success {
            eprintln!("  {} {} ({}ms)", "v".green(), role, latency_ms);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), role);
        }
    }

    fn on_phase_complete(&self, _phase: EnsemblePhase) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_handles_full_run() {
        let reporter = ProgressReporter::new();
        reporter.on_phase_start(EnsemblePhase::Dispatch, 3);
        reporter.on_provider_complete("gpt4o", true, 900);
        reporter.on_provider_complete("claude", false, 12_000);
        reporter.on_phase_start(EnsemblePhase::Voting, 1);
        reporter.on_phase_complete(EnsemblePhase::Voting);
        assert!(reporter.phase_bar.lock().unwrap().is_none());
        // completing twice is harmless
        reporter.on_phase_complete(EnsemblePhase::Voting);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(
            ProgressReporter::phase_display_name(EnsemblePhase::Requery),
            "Re-querying"
        );
    }
}
