//! Voting errors. These never leave the engine: they select the
//! equal-weight fallback and are recorded on the result.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VotingError {
    #[error("Non-finite weight {value} for provider '{role}'")]
    NonFiniteWeight { role: String, value: f64 },

    #[error("Weights have zero total mass")]
    ZeroMass,

    #[error("Invalid softmax temperature: {0}")]
    InvalidTemperature(f64),
}
