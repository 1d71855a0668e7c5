//! Domain layer for ensemble
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns, and no
//! async code: every computation here is a deterministic function of its
//! inputs.
//!
//! # Core Concepts
//!
//! ## Ensemble
//!
//! One prompt is answered by several independent providers at once. Their
//! responses are scored ([`scoring`]), compared ([`diversity`]), weighed
//! against each other ([`voting`]) and merged into one answer
//! ([`synthesis`]).
//!
//! ## Abstention
//!
//! Before a result is returned, [`abstention`] decides whether it is good
//! enough. If not, it picks a re-query strategy that adjusts the tier for a
//! second attempt.

pub mod abstention;
pub mod cache;
pub mod config;
pub mod core;
pub mod diversity;
pub mod orchestration;
pub mod prompt;
pub mod providers;
pub mod scoring;
pub mod synthesis;
pub mod voting;

// Re-export commonly used types
pub use abstention::{
    AbstentionConfig, AbstentionDecision, AbstentionGate, AbstentionReason, QualitySignals,
    RequeryStrategy, RequeryStrategyTable, StrategyKind,
};
pub use cache::{CacheEntry, CacheScope};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{
    error::DomainError,
    model::{Model, Vendor},
    prompt::Prompt,
};
pub use diversity::{DiversityAnalyzer, DiversityResult, DiversityWeights};
pub use orchestration::{
    request::{EnsembleRequest, ProviderSlot, Tier, TierConfig},
    response::{ProviderResponse, RejectionKind, ResponseStatus},
    result::{AbstentionReport, CacheFlags, EnsembleResult, Metadata, RoleResult, VotingReport},
};
pub use prompt::PromptTemplate;
pub use providers::ProviderConfig;
pub use scoring::{ConfidenceScorer, ScoredResponse, ScoringConfig, SemanticConfidence};
pub use synthesis::{SynthesisCandidate, SynthesisConfig, SynthesisResult, SynthesisStatus};
pub use voting::{
    ConsensusGrade, MetaVotingRecord, ReliabilityTable, TieBreakRecord, VotingConfig,
    VotingEngine, VotingResult,
};
