//! Progress notification port
//!
//! Defines the interface for reporting progress during an ensemble run.

/// Stages of one ensemble run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnsemblePhase {
    Dispatch,
    Voting,
    Synthesis,
    Abstention,
    Requery,
}

impl EnsemblePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsemblePhase::Dispatch => "dispatch",
            EnsemblePhase::Voting => "voting",
            EnsemblePhase::Synthesis => "synthesis",
            EnsemblePhase::Abstention => "abstention",
            EnsemblePhase::Requery => "requery",
        }
    }
}

impl std::fmt::Display for EnsemblePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback for progress updates during an ensemble run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: EnsemblePhase, total_tasks: usize);

    /// Called when one provider slot settles during dispatch
    fn on_provider_complete(&self, role: &str, success: bool, latency_ms: u64);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: EnsemblePhase);

    /// Called when the answer was served from the cache
    fn on_cache_hit(&self, _similarity: f64) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: EnsemblePhase, _total_tasks: usize) {}
    fn on_provider_complete(&self, _role: &str, _success: bool, _latency_ms: u64) {}
    fn on_phase_complete(&self, _phase: EnsemblePhase) {}
}
