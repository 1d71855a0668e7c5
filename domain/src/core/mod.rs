//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: vendor models behind provider slots
//! - [`prompt::Prompt`]: a validated user prompt
//! - [`text`]: deterministic tokenization helpers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod prompt;
pub mod text;
