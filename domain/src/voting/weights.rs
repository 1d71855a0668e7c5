//! Raw weight factors and softmax normalization.

use super::config::VotingConfig;
use super::error::VotingError;
use crate::diversity::DiversityResult;
use crate::scoring::ScoredResponse;
use serde::{Deserialize, Serialize};

/// Multipliers that produced one provider's raw weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightFactors {
    pub confidence: f64,
    pub time: f64,
    pub length: f64,
    pub reliability: f64,
    pub diversity: f64,
    pub raw: f64,
}

impl WeightFactors {
    pub fn compute(scored: &ScoredResponse, diversity: &DiversityResult, config: &VotingConfig) -> Self {
        let response = &scored.response;
        let confidence = scored.confidence.score;
        let time = config.time_multiplier(response.latency_ms);
        let length = config.length_multiplier(response.model.vendor(), scored.quality.word_count);
        let reliability = config.reliability.multiplier_for(&response.role);
        let diversity = config.diversity_factor(
            diversity.uniqueness_of(&response.role),
            diversity.mean_uniqueness(),
        );
        Self {
            confidence,
            time,
            length,
            reliability,
            diversity,
            raw: confidence * time * length * reliability * diversity,
        }
    }
}

/// Temperature softmax over raw weights. The output sums to 1.
///
/// Fails on non-finite input, a non-positive temperature or when every raw
/// weight is zero.
pub fn softmax(raw: &[(String, f64)], temperature: f64) -> Result<Vec<f64>, VotingError> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(VotingError::InvalidTemperature(temperature));
    }
    if let Some((role, value)) = raw.iter().find(|(_, w)| !w.is_finite()) {
        return Err(VotingError::NonFiniteWeight {
            role: role.clone(),
            value: *value,
        });
    }
    let mass: f64 = raw.iter().map(|(_, w)| w.abs()).sum();
    if mass <= 0.0 {
        return Err(VotingError::ZeroMass);
    }

    let max = raw
        .iter()
        .map(|(_, w)| *w)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw
        .iter()
        .map(|(_, w)| ((w - max) / temperature).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(VotingError::ZeroMass);
    }
    Ok(exps.into_iter().map(|e| e / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[f64]) -> Vec<(String, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("p{}", i), *v))
            .collect()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let w = softmax(&raw(&[0.9, 0.85, 0.3]), 0.1).unwrap();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(w[0] > w[1] && w[1] > w[2]);
    }

    #[test]
    fn test_softmax_equal_inputs_uniform() {
        let w = softmax(&raw(&[0.5, 0.5]), 0.1).unwrap();
        assert!((w[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_rejects_bad_input() {
        assert!(matches!(
            softmax(&raw(&[0.5, f64::NAN]), 0.1),
            Err(VotingError::NonFiniteWeight { .. })
        ));
        assert_eq!(softmax(&raw(&[0.0, 0.0]), 0.1), Err(VotingError::ZeroMass));
        assert_eq!(
            softmax(&raw(&[0.5]), 0.0),
            Err(VotingError::InvalidTemperature(0.0))
        );
    }
}
