//! In-process counters for ensemble runs
//!
//! Counters are lock-free atomics; [`EnsembleMetrics::snapshot`] gives a
//! read-only copy.

use ensemble_domain::{AbstentionReason, ConsensusGrade, EnsembleResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EnsembleMetrics {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    degraded: AtomicU64,
    processing_ms_total: AtomicU64,
    requeries: AtomicU64,
    requeries_accepted: AtomicU64,
    consensus: [AtomicU64; ConsensusGrade::ALL.len()],
    abstention: [AtomicU64; AbstentionReason::ALL.len()],
}

/// Read-only view of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub average_processing_ms: f64,
    pub degraded: u64,
    pub requeries: u64,
    pub requeries_accepted: u64,
    /// Results per consensus grade
    pub consensus: BTreeMap<String, u64>,
    /// Gate firings per reason
    pub abstention_triggers: BTreeMap<String, u64>,
}

impl EnsembleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request
    pub fn record(&self, result: &EnsembleResult) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.processing_ms_total
            .fetch_add(result.metadata.processing_time_ms, Ordering::Relaxed);

        if result.metadata.cache_flags.cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if result.is_degraded() {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }

        let grade = result.voting.result.consensus;
        if let Some(i) = ConsensusGrade::ALL.iter().position(|g| *g == grade) {
            self.consensus[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count the reasons of an abstention decision that fired
    pub fn record_abstention(&self, reasons: &[AbstentionReason]) {
        for reason in reasons {
            if let Some(i) = AbstentionReason::ALL.iter().position(|r| r == reason) {
                self.abstention[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_requery(&self, accepted: bool) {
        self.requeries.fetch_add(1, Ordering::Relaxed);
        if accepted {
            self.requeries_accepted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let total_ms = self.processing_ms_total.load(Ordering::Relaxed);
        let ratio = |n: u64| {
            if requests == 0 {
                0.0
            } else {
                n as f64 / requests as f64
            }
        };

        MetricsSnapshot {
            requests,
            cache_hits,
            cache_hit_rate: ratio(cache_hits),
            average_processing_ms: ratio(total_ms),
            degraded: self.degraded.load(Ordering::Relaxed),
            requeries: self.requeries.load(Ordering::Relaxed),
            requeries_accepted: self.requeries_accepted.load(Ordering::Relaxed),
            consensus: ConsensusGrade::ALL
                .iter()
                .zip(&self.consensus)
                .map(|(g, n)| (g.to_string(), n.load(Ordering::Relaxed)))
                .collect(),
            abstention_triggers: AbstentionReason::ALL
                .iter()
                .zip(&self.abstention)
                .map(|(r, n)| (r.to_string(), n.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::CacheFlags;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = EnsembleMetrics::new().snapshot();
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.cache_hit_rate, 0.0);
        assert_eq!(snapshot.consensus.len(), 6);
        assert!(snapshot.consensus.values().all(|n| *n == 0));
    }

    #[test]
    fn test_record() {
        let metrics = EnsembleMetrics::new();

        let mut degraded = EnsembleResult::degraded("a", "free", "x", "2.1.0");
        degraded.metadata.processing_time_ms = 100;
        metrics.record(&degraded);

        let mut cached = EnsembleResult::degraded("b", "free", "x", "2.1.0");
        cached.metadata.degraded = false;
        cached.metadata.cache_flags = CacheFlags::exact_hit();
        cached.metadata.processing_time_ms = 10;
        metrics.record(&cached);

        metrics.record_abstention(&[
            AbstentionReason::LowQuality,
            AbstentionReason::InsufficientResponses,
        ]);
        metrics.record_requery(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_hit_rate, 0.5);
        assert_eq!(snapshot.average_processing_ms, 55.0);
        assert_eq!(snapshot.degraded, 1);
        assert_eq!(snapshot.consensus["none"], 1);
        assert_eq!(snapshot.abstention_triggers["low-quality"], 1);
        assert_eq!(snapshot.abstention_triggers["very-weak-consensus"], 0);
        assert_eq!(snapshot.requeries, 1);
        assert_eq!(snapshot.requeries_accepted, 0);
    }
}
