//! Prompt domain
//!
//! Templates for the provider, synthesis and meta-voting calls.

mod template;

pub use template::PromptTemplate;
