//! Response cache settings.

use ensemble_domain::{CacheScope, Tier};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    /// What the cache key is scoped to besides the prompt
    pub scope: CacheScope,
    /// Minimum prompt similarity for a close-enough hit
    pub similarity_threshold: f64,
    /// Prompts refreshed in the background
    pub warm_prompts: Vec<String>,
    pub warm_interval: Duration,
    /// Tier the warm prompts are answered with
    pub warm_tier: Tier,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            scope: CacheScope::Tier,
            similarity_threshold: 0.85,
            warm_prompts: Vec::new(),
            warm_interval: Duration::from_secs(900),
            warm_tier: Tier::Free,
        }
    }
}

impl CacheSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Scope value for one request
    pub fn scope_value(&self, tier: Tier, user_id: &str) -> String {
        match self.scope {
            CacheScope::Tier => format!("tier:{}", tier),
            CacheScope::User => format!("user:{}", user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_value() {
        let settings = CacheSettings::default();
        assert_eq!(settings.scope_value(Tier::Premium, "alice"), "tier:premium");
        let settings = settings.with_scope(CacheScope::User);
        assert_eq!(settings.scope_value(Tier::Premium, "alice"), "user:alice");
    }
}
