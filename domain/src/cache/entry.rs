use crate::core::error::DomainError;
use crate::core::prompt::normalize_prompt;
use crate::core::text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

/// Fewest fingerprint terms a prompt needs before a similarity hit is allowed
pub const MIN_SIMILARITY_TERMS: usize = 3;

/// Words dropped from fingerprints. Question words and negations are kept.
const FILLER: &[&str] = &[
    "a", "an", "the", "and", "or", "to", "of", "in", "on", "at", "by", "for", "with", "from",
    "is", "are", "was", "were", "be", "been", "it", "its", "i", "me", "my", "you", "your", "do",
    "does", "did", "can", "could", "would", "should", "that", "this", "these", "those",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nor", "without", "cannot", "can't", "don't", "doesn't",
    "isn't", "aren't", "wasn't", "won't", "shouldn't", "wouldn't", "couldn't", "didn't",
];

/// What a cache key is scoped to besides the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Shared by every user of a tier
    #[default]
    Tier,
    /// Private to one user
    User,
}

/// One cached result.
///
/// `payload` is the serialized result; stores may compress it at rest.
/// Deserialization applies the same TTL check as [`CacheEntry::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEntry")]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    /// Digest of the prompt hash and the response shape
    pub signature: String,
    /// Normalized prompt keywords used by the similarity scan
    pub fingerprint: Vec<String>,
    /// Scope value the key was built with (tier name or user id)
    pub scope: String,
    pub created_at: SystemTime,
    ttl: Duration,
}

/// Unvalidated on-disk form of a [`CacheEntry`]
#[derive(Deserialize)]
struct StoredEntry {
    key: String,
    payload: String,
    signature: String,
    fingerprint: Vec<String>,
    scope: String,
    created_at: SystemTime,
    ttl: Duration,
}

impl TryFrom<StoredEntry> for CacheEntry {
    type Error = DomainError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        Ok(CacheEntry::new(
            stored.key,
            stored.payload,
            stored.signature,
            stored.fingerprint,
            stored.scope,
            stored.ttl,
        )?
        .with_created_at(stored.created_at))
    }
}

impl CacheEntry {
    /// Fails with [`DomainError::ZeroTtl`] for a zero TTL.
    pub fn new(
        key: impl Into<String>,
        payload: impl Into<String>,
        signature: impl Into<String>,
        fingerprint: Vec<String>,
        scope: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        if ttl.is_zero() {
            return Err(DomainError::ZeroTtl);
        }
        Ok(Self {
            key: key.into(),
            payload: payload.into(),
            signature: signature.into(),
            fingerprint,
            scope: scope.into(),
            created_at: SystemTime::now(),
            ttl,
        })
    }

    pub fn with_created_at(mut self, created_at: SystemTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Restart the entry's lifetime with a new TTL
    pub fn refreshed(mut self, ttl: Duration) -> Result<Self, DomainError> {
        if ttl.is_zero() {
            return Err(DomainError::ZeroTtl);
        }
        self.ttl = ttl;
        self.created_at = SystemTime::now();
        Ok(self)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_at(&self) -> SystemTime {
        self.created_at + self.ttl
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_at(&self, now: SystemTime) -> Duration {
        self.expires_at().duration_since(now).unwrap_or(Duration::ZERO)
    }

    /// Prompt similarity against another fingerprint
    pub fn similarity_to(&self, fingerprint: &[String]) -> f64 {
        fingerprint_similarity(&self.fingerprint, fingerprint)
    }
}

/// Sorted, deduplicated terms of the normalized prompt without filler words.
/// Numbers, short words and negations stay in.
pub fn fingerprint(prompt: &str) -> Vec<String> {
    text::tokens(&normalize_prompt(prompt))
        .into_iter()
        .filter(|t| !FILLER.contains(&t.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Terms that must match exactly for two prompts to count as similar
fn pinned_terms(fingerprint: &[String]) -> BTreeSet<&str> {
    fingerprint
        .iter()
        .map(String::as_str)
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()) || NEGATIONS.contains(t))
        .collect()
}

/// Jaccard similarity of two fingerprints; 0 when their numbers or
/// negations differ
pub fn fingerprint_similarity(a: &[String], b: &[String]) -> f64 {
    if pinned_terms(a) != pinned_terms(b) {
        return 0.0;
    }
    let a: BTreeSet<&String> = a.iter().collect();
    let b: BTreeSet<&String> = b.iter().collect();
    text::jaccard(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Duration) -> Result<CacheEntry, DomainError> {
        CacheEntry::new("k", "{}", "sig", fingerprint("Explain Rust lifetimes"), "free", ttl)
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert_eq!(entry(Duration::ZERO), Err(DomainError::ZeroTtl));
    }

    #[test]
    fn test_expiry() {
        let now = SystemTime::now();
        let e = entry(Duration::from_secs(60)).unwrap().with_created_at(now);
        assert!(!e.is_expired_at(now + Duration::from_secs(59)));
        assert!(e.is_expired_at(now + Duration::from_secs(60)));
        assert_eq!(e.remaining_at(now + Duration::from_secs(90)), Duration::ZERO);
    }

    #[test]
    fn test_refreshed() {
        let old = SystemTime::now() - Duration::from_secs(120);
        let e = entry(Duration::from_secs(60)).unwrap().with_created_at(old);
        assert!(e.is_expired());
        let e = e.refreshed(Duration::from_secs(30)).unwrap();
        assert!(!e.is_expired());
        assert_eq!(e.ttl(), Duration::from_secs(30));
        assert_eq!(e.refreshed(Duration::ZERO), Err(DomainError::ZeroTtl));
    }

    #[test]
    fn test_fingerprint_similarity() {
        let e = entry(Duration::from_secs(60)).unwrap();
        assert_eq!(e.similarity_to(&fingerprint("explain rust lifetimes!")), 1.0);
        assert!(e.similarity_to(&fingerprint("Explain Rust lifetimes in detail")) < 1.0);
        assert_eq!(e.similarity_to(&fingerprint("bake bread")), 0.0);
    }

    #[test]
    fn test_deserialize_checks_ttl() {
        let e = entry(Duration::from_secs(60)).unwrap();
        let mut value = serde_json::to_value(&e).unwrap();
        let back: CacheEntry = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, e);

        value["ttl"] = serde_json::json!({ "secs": 0, "nanos": 0 });
        let err = serde_json::from_value::<CacheEntry>(value).unwrap_err();
        assert!(err.to_string().contains("TTL"));
    }

    #[test]
    fn test_fingerprint_keeps_numbers_and_negations() {
        let fp = fingerprint("Why is Rust not memory safe?");
        assert_eq!(fp, vec!["memory", "not", "rust", "safe", "why"]);
        let fp = fingerprint("Convert 100 USD to EUR");
        assert_eq!(fp, vec!["100", "convert", "eur", "usd"]);
    }

    #[test]
    fn test_numbers_and_negations_must_match() {
        let a = fingerprint("Convert 100 USD to EUR please");
        assert_eq!(fingerprint_similarity(&a, &fingerprint("Convert 250 USD to EUR please")), 0.0);
        assert_eq!(fingerprint_similarity(&a, &fingerprint("please convert 100 usd to eur")), 1.0);

        let safe = fingerprint("Is Rust memory safe?");
        assert_eq!(fingerprint_similarity(&safe, &fingerprint("Is Rust not memory safe?")), 0.0);
        assert!(fingerprint_similarity(&safe, &fingerprint("Why is Rust memory safe?")) < 0.85);
    }
}
