//! Abstention & re-query policy
//!
//! After voting and synthesis the gate decides whether the result is good
//! enough to return. When it is not, it names the reasons, a severity and the
//! re-query strategy best suited to the failure mode. Running the re-query is
//! the application layer's job.

pub mod config;
pub mod decision;
pub mod strategy;

pub use config::{AbstentionConfig, QualityWeights};
pub use decision::{AbstentionDecision, AbstentionGate, AbstentionReason, QualitySignals, Severity};
pub use strategy::{RequeryStrategy, RequeryStrategyTable, StrategyKind};
