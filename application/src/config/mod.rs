//! Application-level configuration.
//!
//! [`EnsembleConfig`] bundles every table the pipeline consults. The
//! infrastructure layer builds it from the merged TOML/env configuration;
//! [`EnsembleConfig::default`] gives the built-in values.

pub mod cache_settings;
pub mod ensemble_config;

pub use cache_settings::CacheSettings;
pub use ensemble_config::{EnsembleConfig, PipelineSettings, TierSettings};
