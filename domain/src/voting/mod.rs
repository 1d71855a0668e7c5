//! Voting & consensus
//!
//! Turns scored responses into a single winner:
//!
//! 1. raw weight = confidence × time × length × reliability × diversity factor
//! 2. temperature softmax over fulfilled providers (weights sum to 1)
//! 3. winner = argmax, re-ranked by the tie-break when the top two are close
//! 4. consensus graded from winner weight, margin and normalized entropy
//!
//! Any internal failure falls back to equal-weight voting, so the engine
//! itself never returns an error.

pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod meta;
pub mod tie_break;
pub mod weights;

pub use config::{ConsensusThresholds, LengthBand, ReliabilityTable, TimeBand, VotingConfig};
pub use consensus::{ConsensusGrade, Distribution};
pub use engine::{VotingAnalytics, VotingEngine, VotingResult};
pub use error::VotingError;
pub use meta::{MetaChoice, MetaVotingRecord, parse_meta_vote};
pub use tie_break::TieBreakRecord;
pub use weights::WeightFactors;
