//! Ensemble orchestration domain
//!
//! Request, per-provider response and final result types that flow through
//! one ensemble run.

pub mod request;
pub mod response;
pub mod result;
