//! The optimization passes

use crate::entity::extract_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Phrases that add words without adding intent.
static REDUNDANCY_TABLE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bI was wondering if you could\b", "Please"),
        (r"(?i)\bCould you please possibly\b", "Please"),
        (r"(?i)\bI would like to request that you\b", "Please"),
        (r"(?i)\bIt would be great if you could\b", "Please"),
        (r"(?i)\bI'm trying to figure out how to\b", "How to"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).expect("redundancy pattern must compile"), r))
    .collect()
});

/// Verbose phrase → concise equivalent.
static SIMPLIFICATION_TABLE: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bin order to\b", "to"),
        (r"(?i)\bdue to the fact that\b", "because"),
        (r"(?i)\bat this point in time\b", "now"),
        (r"(?i)\bfor the purpose of\b", "to"),
        (r"(?i)\bin the event that\b", "if"),
        (r"(?i)\bprior to\b", "before"),
        (r"(?i)\bsubsequent to\b", "after"),
        (r"(?i)\bwith regard to\b", "about"),
        (r"(?i)\bin close proximity to\b", "near"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).expect("simplification pattern must compile"), r))
    .collect()
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// Leftovers like " , " after filler removal.
static DANGLING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.;:!?])").expect("punctuation pattern must compile"));

const DEFAULT_STOPWORDS: &[&str] = &[
    "basically",
    "actually",
    "literally",
    "honestly",
    "frankly",
    "really",
    "very",
    "quite",
    "just",
    "simply",
    "merely",
    "perhaps",
    "maybe",
    "possibly",
    "probably",
    "essentially",
    "practically",
    "virtually",
    "effectively",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_true")]
    pub remove_redundancy: bool,
    #[serde(default = "default_true")]
    pub remove_filler_words: bool,
    #[serde(default = "default_true")]
    pub simplify_language: bool,
    #[serde(default = "default_true")]
    pub compress_whitespace: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            remove_redundancy: true,
            remove_filler_words: true,
            simplify_language: true,
            compress_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopwordConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub custom_words: Vec<String>,
}

impl Default for StopwordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prompts shorter than this are returned untouched.
    #[serde(default = "default_min_prompt_length")]
    pub min_prompt_length: usize,

    /// Advisory reduction goal, reported but not enforced.
    #[serde(default = "default_target_reduction")]
    pub target_reduction: f32,

    #[serde(default)]
    pub strategies: StrategyConfig,

    #[serde(default)]
    pub stopwords: StopwordConfig,
}

fn default_true() -> bool {
    true
}

fn default_min_prompt_length() -> usize {
    50
}

fn default_target_reduction() -> f32 {
    0.3
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_prompt_length: default_min_prompt_length(),
            target_reduction: default_target_reduction(),
            strategies: StrategyConfig::default(),
            stopwords: StopwordConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    pub applied: bool,
    pub skip_reason: Option<String>,
    pub elapsed_ms: u64,
}

impl OptimizationOutcome {
    fn skipped(prompt: &str, reason: &str) -> Self {
        let tokens = estimate_tokens(prompt);
        Self {
            original_prompt: prompt.to_string(),
            optimized_prompt: prompt.to_string(),
            original_tokens: tokens,
            optimized_tokens: tokens,
            applied: false,
            skip_reason: Some(reason.to_string()),
            elapsed_ms: 0,
        }
    }

    pub fn tokens_saved(&self) -> usize {
        self.original_tokens.saturating_sub(self.optimized_tokens)
    }

    pub fn reduction_percentage(&self) -> f32 {
        if self.original_tokens == 0 {
            return 0.0;
        }
        self.tokens_saved() as f32 / self.original_tokens as f32 * 100.0
    }
}

/// Rough token estimate, ~4 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

pub struct PromptOptimizer {
    config: OptimizerConfig,
    stopword_re: Option<Regex>,
}

impl PromptOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let stopword_re = if config.stopwords.enabled {
            let mut words: Vec<String> = DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect();
            words.extend(
                config
                    .stopwords
                    .custom_words
                    .iter()
                    .map(|w| regex::escape(w)),
            );
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            // Word lists are escaped above, so the join always compiles
            Regex::new(&pattern).ok()
        } else {
            None
        };
        Self {
            config,
            stopword_re,
        }
    }

    /// Compress the (already redacted) prompt. Sensitive-value tokens and
    /// extracted entities are computed per pass and never modified.
    pub fn optimize(&self, prompt: &str) -> OptimizationOutcome {
        let started = Instant::now();

        if prompt.trim().is_empty() {
            return OptimizationOutcome::skipped(prompt, "empty prompt");
        }
        if !self.config.enabled {
            return OptimizationOutcome::skipped(prompt, "optimization disabled");
        }
        if prompt.len() < self.config.min_prompt_length {
            return OptimizationOutcome::skipped(prompt, "prompt below minimum length");
        }

        let mut text = prompt.to_string();

        if self.config.strategies.remove_redundancy {
            text = apply_table(&text, &REDUNDANCY_TABLE);
        }
        if self.config.strategies.remove_filler_words {
            if let Some(re) = &self.stopword_re {
                text = replace_outside_protected(&text, re, "");
            }
        }
        if self.config.strategies.simplify_language {
            text = apply_table(&text, &SIMPLIFICATION_TABLE);
        }
        if self.config.strategies.compress_whitespace {
            text = DANGLING_PUNCT_RE.replace_all(&text, "$1").into_owned();
            text = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();
        }

        let outcome = OptimizationOutcome {
            original_tokens: estimate_tokens(prompt),
            optimized_tokens: estimate_tokens(&text),
            original_prompt: prompt.to_string(),
            optimized_prompt: text,
            applied: true,
            skip_reason: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            original_tokens = outcome.original_tokens,
            optimized_tokens = outcome.optimized_tokens,
            "Prompt optimization complete"
        );
        outcome
    }
}

impl Default for PromptOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

fn apply_table(text: &str, table: &[(Regex, &'static str)]) -> String {
    let mut result = text.to_string();
    for (re, replacement) in table {
        result = replace_outside_protected(&result, re, replacement);
    }
    result
}

/// Byte ranges no pass may rewrite: sensitive-value tokens plus extracted
/// entities, recomputed against the current text.
fn protected_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = aegis_pii::token_regex()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.extend(extract_entities(text).into_iter().map(|e| (e.start, e.end)));
    spans.sort_unstable();
    spans
}

/// Apply a single substitution everywhere it does not intersect a
/// protected span.
fn replace_outside_protected(text: &str, re: &Regex, replacement: &str) -> String {
    let protected = protected_spans(text);
    let intersects =
        |start: usize, end: usize| protected.iter().any(|&(s, e)| start < e && s < end);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for hit in re.find_iter(text) {
        out.push_str(&text[last..hit.start()]);
        if intersects(hit.start(), hit.end()) {
            out.push_str(hit.as_str());
        } else {
            out.push_str(replacement);
        }
        last = hit.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redundancy_and_filler_removal() {
        let optimizer = PromptOptimizer::default();
        let prompt = "So basically, I was wondering if you could possibly help me write an email actually about the project status.";
        let outcome = optimizer.optimize(prompt);

        assert!(outcome.applied);
        assert!(outcome.tokens_saved() > 0);
        assert!(!outcome.optimized_prompt.contains("basically"));
        assert!(!outcome.optimized_prompt.contains("actually"));
        assert!(!outcome.optimized_prompt.contains("wondering"));
        assert!(outcome.optimized_prompt.contains("Please"));
    }

    #[test]
    fn test_simplifications() {
        let optimizer = PromptOptimizer::default();
        let prompt =
            "In order to ship on time, and due to the fact that tests fail, review this prior to merging.";
        let outcome = optimizer.optimize(prompt);

        let lower = outcome.optimized_prompt.to_lowercase();
        assert!(lower.contains("to ship on time"));
        assert!(lower.contains("because tests fail"));
        assert!(lower.contains("before merging"));
        assert!(!lower.contains("in order to"));
    }

    #[test]
    fn test_whitespace_compression() {
        let optimizer = PromptOptimizer::default();
        let prompt = "Summarize   this\n\n  document    thoroughly and completely, thanks in advance.";
        let outcome = optimizer.optimize(prompt);
        assert!(!outcome.optimized_prompt.contains("  "));
        assert!(!outcome.optimized_prompt.contains('\n'));
    }

    #[test]
    fn test_short_prompt_skipped() {
        let optimizer = PromptOptimizer::default();
        let outcome = optimizer.optimize("Hello, world!");
        assert!(!outcome.applied);
        assert_eq!(outcome.optimized_prompt, "Hello, world!");
        assert_eq!(outcome.skip_reason.as_deref(), Some("prompt below minimum length"));
    }

    #[test]
    fn test_disabled_optimizer_skips() {
        let optimizer = PromptOptimizer::new(OptimizerConfig {
            enabled: false,
            ..Default::default()
        });
        let prompt = "Basically I was wondering if you could possibly summarize this very long report.";
        let outcome = optimizer.optimize(prompt);
        assert!(!outcome.applied);
        assert_eq!(outcome.optimized_prompt, prompt);
    }

    #[test]
    fn test_tokens_are_never_modified() {
        let optimizer = PromptOptimizer::default();
        // "really" appears inside the surrounding text but the token span
        // itself must survive byte-for-byte
        let prompt = "Please really do email [EMAIL_TOKEN_a7f3e2] about the basically finished report, thanks.";
        let outcome = optimizer.optimize(prompt);
        assert!(outcome.optimized_prompt.contains("[EMAIL_TOKEN_a7f3e2]"));
        assert!(!outcome.optimized_prompt.contains("really"));
    }

    #[test]
    fn test_requirement_clause_is_left_alone() {
        let optimizer = PromptOptimizer::default();
        // Sentence one is a requirement clause and must survive verbatim;
        // sentence two is fair game
        let prompt =
            "the deploy must be approved prior to release. Afterwards we basically celebrated quite hard.";
        let outcome = optimizer.optimize(prompt);

        assert!(outcome
            .optimized_prompt
            .contains("must be approved prior to release"));
        assert!(!outcome.optimized_prompt.contains("basically"));
        assert!(!outcome.optimized_prompt.contains("quite"));
    }

    #[test]
    fn test_entities_protected_from_passes() {
        let optimizer = PromptOptimizer::new(OptimizerConfig {
            stopwords: StopwordConfig {
                enabled: true,
                custom_words: vec!["1,234".into()],
            },
            ..Default::default()
        });
        // The amount would match the custom stopword but sits in a
        // protected span
        let prompt = "Transfer exactly $1,234 to the vendor account quite quickly, and confirm receipt.";
        let outcome = optimizer.optimize(prompt);
        assert!(outcome.optimized_prompt.contains("$1,234"));
        assert!(!outcome.optimized_prompt.contains("quite"));
    }

    #[test]
    fn test_reduction_percentage() {
        let outcome = OptimizationOutcome {
            original_prompt: String::new(),
            optimized_prompt: String::new(),
            original_tokens: 40,
            optimized_tokens: 30,
            applied: true,
            skip_reason: None,
            elapsed_ms: 1,
        };
        assert_eq!(outcome.tokens_saved(), 10);
        assert!((outcome.reduction_percentage() - 25.0).abs() < f32::EPSILON);
    }
}
