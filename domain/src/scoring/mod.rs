//! Confidence & quality scoring
//!
//! A pure function of one [`ProviderResponse`](crate::ProviderResponse):
//!
//! ```text
//! score = clamp01(base + length band + structure + sophistication
//!                 + latency adjustment + vendor prior)
//! blended = 0.7 * semantic + 0.3 * score      (when a semantic signal exists)
//! ```
//!
//! Rejected responses always score `0.0`.

pub mod config;
pub mod confidence;
pub mod quality;

pub use config::{LatencyAdjustment, LengthWindow, LevelThresholds, ScoringConfig};
pub use confidence::{
    ConfidenceLevel, ConfidenceScore, ConfidenceScorer, ScoredResponse, SemanticConfidence,
};
pub use quality::{Complexity, QualityMetrics};
