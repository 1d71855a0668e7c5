//! Structural quality metrics of one response.

use crate::core::text;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+\S").expect("valid regex"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+\S").expect("valid regex"));
pub(crate) static CAUSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(because|therefore|thus|hence|consequently|as a result|due to|so that)\b")
        .expect("valid regex")
});
pub(crate) static CONTRASTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(however|although|whereas|nevertheless|on the other hand|in contrast|despite)\b")
        .expect("valid regex")
});
pub(crate) static EVIDENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(for example|for instance|according to|research shows|studies show|evidence|data suggests|such as)\b",
    )
    .expect("valid regex")
});

/// Lexical complexity bucket, from the unique-word ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// >0.7 high, >0.5 medium, otherwise low
    pub fn from_unique_ratio(ratio: f64) -> Self {
        if ratio > 0.7 {
            Complexity::High
        } else if ratio > 0.5 {
            Complexity::Medium
        } else {
            Complexity::Low
        }
    }
}

/// Quality metrics of a response text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    /// Lists, headers or multiple paragraphs
    pub has_structure: bool,
    /// Causal, contrastive or evidential connectives present
    pub has_reasoning: bool,
    pub complexity: Complexity,
}

impl QualityMetrics {
    /// Metrics of an empty/rejected response
    pub fn empty() -> Self {
        Self {
            word_count: 0,
            sentence_count: 0,
            avg_words_per_sentence: 0.0,
            has_structure: false,
            has_reasoning: false,
            complexity: Complexity::Low,
        }
    }

    /// Compute metrics for a text
    pub fn analyze(content: &str) -> Self {
        let tokens = text::tokens(content);
        let word_count = tokens.len();
        if word_count == 0 {
            return Self::empty();
        }
        let sentence_count = text::sentences(content).len().max(1);
        let unique: BTreeSet<&String> = tokens.iter().collect();
        let unique_ratio = unique.len() as f64 / word_count as f64;

        Self {
            word_count,
            sentence_count,
            avg_words_per_sentence: word_count as f64 / sentence_count as f64,
            has_structure: has_structure(content),
            has_reasoning: has_reasoning(content),
            complexity: Complexity::from_unique_ratio(unique_ratio),
        }
    }
}

pub(crate) fn has_list(content: &str) -> bool {
    LIST_MARKER.is_match(content)
}

pub(crate) fn has_structure(content: &str) -> bool {
    has_list(content) || HEADER.is_match(content) || content.trim().contains("\n\n")
}

pub(crate) fn has_reasoning(content: &str) -> bool {
    CAUSAL.is_match(content) || CONTRASTIVE.is_match(content) || EVIDENTIAL.is_match(content)
}
