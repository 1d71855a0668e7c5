//! Pairwise similarity and diversity of fulfilled responses.

use super::concepts;
use crate::core::text;
use crate::orchestration::response::ProviderResponse;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Weights of the four similarity components. They are expected to sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityWeights {
    pub keyword: f64,
    pub bigram: f64,
    pub sentence: f64,
    pub concept: f64,
}

impl Default for DiversityWeights {
    fn default() -> Self {
        Self {
            keyword: 0.3,
            bigram: 0.25,
            sentence: 0.2,
            concept: 0.25,
        }
    }
}

impl DiversityWeights {
    pub fn total(&self) -> f64 {
        self.keyword + self.bigram + self.sentence + self.concept
    }
}

/// Result of analyzing a response set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityResult {
    /// Roles in slot order; indexes into `similarity`
    pub roles: Vec<String>,
    /// Symmetric pairwise similarity, 1.0 on the diagonal
    pub similarity: Vec<Vec<f64>>,
    /// Mean `1 - similarity` over all pairs, in [0,1]
    pub overall: f64,
    /// Mean `1 - similarity` of each response against every other
    pub uniqueness: BTreeMap<String, f64>,
}

impl DiversityResult {
    pub fn uniqueness_of(&self, role: &str) -> f64 {
        self.uniqueness.get(role).copied().unwrap_or(0.0)
    }

    /// Mean uniqueness across responses
    pub fn mean_uniqueness(&self) -> f64 {
        if self.uniqueness.is_empty() {
            return 0.0;
        }
        self.uniqueness.values().sum::<f64>() / self.uniqueness.len() as f64
    }

    pub fn similarity_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.roles.iter().position(|r| r == a)?;
        let j = self.roles.iter().position(|r| r == b)?;
        Some(self.similarity[i][j])
    }
}

/// Features extracted once per response
struct Features {
    keywords: BTreeSet<String>,
    bigrams: BTreeSet<String>,
    sentence_bucket: u8,
    concepts: BTreeSet<String>,
}

impl Features {
    fn of(content: &str) -> Self {
        Self {
            keywords: text::keywords(content),
            bigrams: text::bigrams(content),
            sentence_bucket: sentence_bucket(text::sentences(content).len()),
            concepts: concepts::extract(content),
        }
    }
}

/// Deterministic diversity analyzer
#[derive(Debug, Clone, Default)]
pub struct DiversityAnalyzer {
    weights: DiversityWeights,
}

impl DiversityAnalyzer {
    pub fn new(weights: DiversityWeights) -> Self {
        Self { weights }
    }

    /// Analyze the fulfilled responses among `responses`. Rejected ones are
    /// ignored. Fewer than two fulfilled responses yield zero diversity.
    pub fn analyze(&self, responses: &[ProviderResponse]) -> DiversityResult {
        let fulfilled: Vec<&ProviderResponse> =
            responses.iter().filter(|r| r.is_fulfilled()).collect();
        let roles: Vec<String> = fulfilled.iter().map(|r| r.role.clone()).collect();
        let n = fulfilled.len();

        if n < 2 {
            return DiversityResult {
                similarity: vec![vec![1.0; n]; n],
                uniqueness: roles.iter().map(|r| (r.clone(), 0.0)).collect(),
                roles,
                overall: 0.0,
            };
        }

        let features: Vec<Features> = fulfilled.iter().map(|r| Features::of(&r.content)).collect();
        let mut similarity = vec![vec![1.0; n]; n];
        let mut pair_total = 0.0;
        let mut pairs = 0usize;

        for i in 0..n {
            for j in (i + 1)..n {
                let sim = self.similarity(&features[i], &features[j]);
                similarity[i][j] = sim;
                similarity[j][i] = sim;
                pair_total += 1.0 - sim;
                pairs += 1;
            }
        }

        let uniqueness = roles
            .iter()
            .enumerate()
            .map(|(i, role)| {
                let sum: f64 = (0..n).filter(|&j| j != i).map(|j| 1.0 - similarity[i][j]).sum();
                (role.clone(), (sum / (n - 1) as f64).clamp(0.0, 1.0))
            })
            .collect();

        DiversityResult {
            roles,
            similarity,
            overall: (pair_total / pairs as f64).clamp(0.0, 1.0),
            uniqueness,
        }
    }

    /// Similarity of two texts in [0,1]
    pub fn similarity_of(&self, a: &str, b: &str) -> f64 {
        self.similarity(&Features::of(a), &Features::of(b))
    }

    fn similarity(&self, a: &Features, b: &Features) -> f64 {
        let w = &self.weights;
        let total = w.total();
        if total <= 0.0 {
            return 0.0;
        }
        let bucket_delta = a.sentence_bucket.abs_diff(b.sentence_bucket) as f64;
        let sim = w.keyword * text::jaccard(&a.keywords, &b.keywords)
            + w.bigram * text::jaccard(&a.bigrams, &b.bigrams)
            + w.sentence * (1.0 - bucket_delta / 4.0)
            + w.concept * text::jaccard(&a.concepts, &b.concepts);
        (sim / total).clamp(0.0, 1.0)
    }
}

/// Sentence-count bucket: 1 | 2-3 | 4-6 | 7-10 | >10
fn sentence_bucket(count: usize) -> u8 {
    match count {
        0 | 1 => 0,
        2..=3 => 1,
        4..=6 => 2,
        7..=10 => 3,
        _ => 4,
    }
}
