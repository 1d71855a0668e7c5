//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod cache_store;
pub mod llm_gateway;
pub mod memory;
pub mod progress;
pub mod reliability;
pub mod semantic_confidence;
