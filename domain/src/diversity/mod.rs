//! Diversity analysis
//!
//! Measures how differently the fulfilled responses answered the prompt.
//! Pairwise similarity is a weighted blend of keyword overlap, bigram overlap,
//! sentence-count shape and shared concepts; diversity is its complement.
//! Voting uses per-response uniqueness; abstention uses the overall value.

pub mod analyzer;
pub mod concepts;

pub use analyzer::{DiversityAnalyzer, DiversityResult, DiversityWeights};
