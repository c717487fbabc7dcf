//! Deterministic cache key derivation
//!
//! `{prefix}:{hash}` where `hash` is the first 12 characters of the
//! URL-safe unpadded base64 of SHA-256 over `prompt | model [| params]`.
//! Twelve base64 characters carry ~72 bits, plenty under per-key TTLs.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

const HASH_LENGTH: usize = 12;

#[derive(Debug, Clone)]
pub struct CacheKeyGenerator {
    prefix: String,
}

impl CacheKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&self, prompt: &str, model_id: &str, params: Option<&str>) -> String {
        let mut composite = String::with_capacity(prompt.len() + model_id.len() + 2);
        composite.push_str(prompt);
        composite.push('|');
        composite.push_str(model_id);
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            composite.push('|');
            composite.push_str(params);
        }

        let digest = Sha256::digest(composite.as_bytes());
        let encoded = URL_SAFE_NO_PAD.encode(digest);
        format!("{}:{}", self.prefix, &encoded[..HASH_LENGTH])
    }

    /// Whether a key was minted by this generator.
    pub fn owns(&self, key: &str) -> bool {
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|hash| hash.len() == HASH_LENGTH)
    }
}

impl Default for CacheKeyGenerator {
    fn default() -> Self {
        Self::new("llm")
    }
}
