//! Cache keys and similarity signatures.
//!
//! ```text
//! key       = hex(sha256(normalized prompt ‖ 0x1f ‖ scope))
//! signature = hex(sha256(prompt hash ‖ 0x1f ‖ response shape))
//! ```

use ensemble_domain::EnsembleResult;
use ensemble_domain::core::prompt::normalize_prompt;
use sha2::{Digest, Sha256};

const SEPARATOR: &[u8] = &[0x1f];

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(SEPARATOR);
        }
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Exact-match key of a prompt within a scope
pub fn cache_key(prompt: &str, scope: &str) -> String {
    sha256_hex(&[normalize_prompt(prompt).as_bytes(), scope.as_bytes()])
}

/// Hash of the normalized prompt alone
pub fn prompt_hash(prompt: &str) -> String {
    sha256_hex(&[normalize_prompt(prompt).as_bytes()])
}

/// Compact description of a result's shape: winner, consensus, synthesis
/// status and which roles fulfilled.
pub fn response_shape(result: &EnsembleResult) -> String {
    let roles: Vec<String> = result
        .roles
        .iter()
        .map(|r| {
            let mark = if r.status.is_fulfilled() { '+' } else { '-' };
            format!("{}{}", mark, r.role)
        })
        .collect();
    format!(
        "winner={};consensus={};synthesis={};roles={}",
        result.winner().unwrap_or("-"),
        result.voting.result.consensus,
        result.synthesis.status,
        roles.join(",")
    )
}

pub fn signature(prompt_hash: &str, shape: &str) -> String {
    sha256_hex(&[prompt_hash.as_bytes(), shape.as_bytes()])
}
