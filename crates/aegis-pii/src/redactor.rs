//! Token substitution and restoration
//!
//! Redaction replaces each detected span with a bracket-delimited token and
//! records the reverse mapping in the request's [`SvContext`]. Restoration
//! walks the response text and swaps known tokens back; tokens the model
//! invented are left verbatim.

use crate::context::SvContext;
use crate::detector::SvMatch;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Recognizes `[KIND_TOKEN_id]` for both id shapes: random mode emits
/// lowercase hex, sequential mode emits decimal, and decimal digits are a
/// subset of the hex class, so one pattern covers both.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Z_]+_TOKEN_[a-f0-9]+\]").expect("token pattern must compile"));

/// The compiled token pattern. Downstream passes use it to treat tokens as
/// opaque runs that must never be rewritten.
pub fn token_regex() -> &'static Regex {
    &TOKEN_RE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenGeneration {
    /// Hex id from a random 128-bit value (default).
    #[default]
    Random,
    /// Per-context counter. Deterministic; useful when debugging.
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactorConfig {
    #[serde(default)]
    pub token_generation: TokenGeneration,

    /// Hex chars kept from the random value in `Random` mode.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

fn default_token_length() -> usize {
    6
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self {
            token_generation: TokenGeneration::Random,
            token_length: default_token_length(),
        }
    }
}

pub struct Redactor {
    config: RedactorConfig,
}

impl Redactor {
    pub fn new(config: RedactorConfig) -> Self {
        Self { config }
    }

    /// Replace every match with a fresh token, storing mappings in `ctx`.
    ///
    /// Substitution runs from the end of the text towards the start so
    /// earlier byte offsets stay valid while later spans are rewritten.
    pub fn redact(&self, text: &str, matches: &[SvMatch], ctx: &SvContext) -> String {
        if matches.is_empty() {
            return text.to_string();
        }

        let mut ordered: Vec<&SvMatch> = matches.iter().collect();
        ordered.sort_by(|a, b| b.start.cmp(&a.start));

        let mut redacted = text.to_string();
        for m in ordered {
            let token = self.generate_token(&m.kind, ctx);
            ctx.add_mapping(
                token.clone(),
                m.value.clone(),
                &m.kind,
                Some((m.start, m.end)),
            );
            redacted.replace_range(m.start..m.end, &token);
            debug!(kind = %m.kind, start = m.start, end = m.end, "Redacted span");
        }

        redacted
    }

    /// Redact only the listed kinds; everything else stays visible.
    pub fn redact_selective(
        &self,
        text: &str,
        matches: &[SvMatch],
        kinds: &[&str],
        ctx: &SvContext,
    ) -> String {
        let filtered: Vec<SvMatch> = matches
            .iter()
            .filter(|m| kinds.contains(&m.kind.as_str()))
            .cloned()
            .collect();
        self.redact(text, &filtered, ctx)
    }

    /// Substitute known tokens back to their originals. Idempotent:
    /// re-running over already-restored text changes nothing.
    pub fn restore(&self, text: &str, ctx: &SvContext) -> String {
        if text.is_empty() {
            return text.to_string();
        }

        let spans: Vec<(usize, usize, String)> = TOKEN_RE
            .find_iter(text)
            .map(|m| (m.start(), m.end(), m.as_str().to_string()))
            .collect();

        let mut restored = text.to_string();
        let mut count = 0usize;
        for (start, end, token) in spans.into_iter().rev() {
            if let Some(original) = ctx.original_value(&token) {
                restored.replace_range(start..end, &original);
                count += 1;
            }
            // Unknown token: leave verbatim, the model may have made it up
        }

        if count > 0 {
            debug!(count, "Restored tokens in response");
        }
        restored
    }

    fn generate_token(&self, kind: &str, ctx: &SvContext) -> String {
        let id = match self.config.token_generation {
            TokenGeneration::Random => {
                let mut bytes = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut bytes);
                let hex = hex::encode(bytes);
                hex[..self.config.token_length.min(hex.len())].to_string()
            }
            TokenGeneration::Sequential => ctx.next_sequence().to_string(),
        };
        format!("[{kind}_TOKEN_{id}]")
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(RedactorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{Detector, RegexDetector};
    use crate::pattern::PatternRegistry;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    fn detector() -> RegexDetector {
        RegexDetector::new(Arc::new(PatternRegistry::builtin()), HashMap::new())
    }

    fn ctx() -> SvContext {
        SvContext::new(Uuid::new_v4())
    }

    #[test]
    fn test_redact_then_restore_round_trips() {
        let text = "Contact me at john.doe@example.com regarding the project.";
        let report = detector().detect(text);
        assert!(report.detected());

        let redactor = Redactor::default();
        let ctx = ctx();
        let redacted = redactor.redact(text, &report.matches, &ctx);

        assert!(!redacted.contains("john.doe@example.com"));
        assert!(redacted.contains("[EMAIL_TOKEN_"));

        let restored = redactor.restore(&redacted, &ctx);
        assert_eq!(restored, text);
    }

    #[test]
    fn test_round_trip_with_interleaved_matches() {
        let text = "Mail bob.smith@corp.io, card 4532-0151-1283-0366, or call +14155552671 today.";
        let report = detector().detect(text);
        assert!(report.count() >= 3);

        let redactor = Redactor::default();
        let ctx = ctx();
        let redacted = redactor.redact(text, &report.matches, &ctx);

        assert!(!redacted.contains("bob.smith@corp.io"));
        assert!(!redacted.contains("4532-0151-1283-0366"));
        assert!(!redacted.contains("+14155552671"));

        assert_eq!(redactor.restore(&redacted, &ctx), text);
    }

    #[test]
    fn test_no_original_value_survives_redaction() {
        let text = "Send to alice@example.org and bill 4532015112830366 now";
        let report = detector().detect(text);
        let redactor = Redactor::default();
        let ctx = ctx();
        let redacted = redactor.redact(text, &report.matches, &ctx);

        for m in &report.matches {
            assert!(
                !redacted.contains(&m.value),
                "original {:?} leaked into redacted text",
                m.value
            );
        }
        assert_eq!(ctx.detection_count(), report.count());
    }

    #[test]
    fn test_sequential_mode_counts_up() {
        let text = "Pair: a.first@example.org b.second@example.org";
        let report = detector().detect(text);
        assert_eq!(report.count(), 2);

        let redactor = Redactor::new(RedactorConfig {
            token_generation: TokenGeneration::Sequential,
            token_length: 6,
        });
        let ctx = ctx();
        let redacted = redactor.redact(text, &report.matches, &ctx);

        // Reverse-order substitution assigns id 1 to the later match
        assert!(redacted.contains("[EMAIL_TOKEN_1]"));
        assert!(redacted.contains("[EMAIL_TOKEN_2]"));

        assert_eq!(redactor.restore(&redacted, &ctx), text);
    }

    #[test]
    fn test_restore_leaves_unknown_tokens() {
        let redactor = Redactor::default();
        let ctx = ctx();
        let text = "The model invented [EMAIL_TOKEN_deadbe] on its own.";
        assert_eq!(redactor.restore(text, &ctx), text);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let text = "Ping admin@example.net please";
        let report = detector().detect(text);
        let redactor = Redactor::default();
        let ctx = ctx();
        let redacted = redactor.redact(text, &report.matches, &ctx);

        let once = redactor.restore(&redacted, &ctx);
        let twice = redactor.restore(&once, &ctx);
        assert_eq!(once, twice);
        assert_eq!(once, text);
    }

    #[test]
    fn test_selective_redaction() {
        let text = "Mail carol@example.io or call +14155552671";
        let report = detector().detect(text);
        let redactor = Redactor::default();
        let ctx = ctx();

        let redacted = redactor.redact_selective(text, &report.matches, &["EMAIL"], &ctx);
        assert!(!redacted.contains("carol@example.io"));
        assert!(redacted.contains("+14155552671"));
    }

    #[test]
    fn test_token_shape() {
        let redactor = Redactor::default();
        let ctx = ctx();
        let token = redactor.generate_token("CREDIT_CARD", &ctx);
        assert!(TOKEN_RE.is_match(&token), "bad token shape: {token}");
        assert!(token.starts_with("[CREDIT_CARD_TOKEN_"));
        assert!(token.ends_with(']'));
    }
}
