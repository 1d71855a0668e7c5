//! Synthesis of the final answer
//!
//! The model call itself lives in the application layer. This module holds
//! what can be decided without I/O: which candidates go into the composition
//! prompt and in which order, how confident the synthesized answer is, and
//! the deterministic fallback used when the synthesizer fails.

pub mod config;
pub mod result;

pub use config::SynthesisConfig;
pub use result::{SynthesisCandidate, SynthesisResult, SynthesisStatus, candidates};
