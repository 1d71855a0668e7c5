//! Use cases for the ensemble pipeline

pub mod dispatch;
pub mod meta_vote;
pub mod requery;
pub mod run_ensemble;
pub mod synthesize;
pub mod warm_cache;
