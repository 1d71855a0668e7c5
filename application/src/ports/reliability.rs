//! Historical provider accuracy feed

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReliabilityError {
    #[error("Reliability feed unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ReliabilityFeed: Send + Sync {
    /// Accuracy in [0,1] keyed by provider role
    async fn provider_accuracy(&self) -> Result<HashMap<String, f64>, ReliabilityError>;
}
