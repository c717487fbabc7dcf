//! Prompt complexity scoring
//!
//! The score is the clamped sum of three independent factors:
//! - length (0-30): bucketed estimated token count
//! - reasoning (0-40): reasoning keywords, multi-step markers, creative
//!   verbs and question density
//! - technical (0-30): technical terms and code markers
//!
//! Keyword classes are closed sets fixed at build time; the analyzer is
//! pure, so identical inputs always score identically within a build.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

static REASONING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:analyze|compare|evaluate|explain|describe|why|how|consider|reasoning|logic|conclusion|therefore|because|pros and cons|advantages|disadvantages|trade-off)\b",
    )
    .expect("reasoning pattern must compile")
});

static MULTISTEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:first|second|third|then|next|finally|step|phase|and then|after that|following that)\b",
    )
    .expect("multi-step pattern must compile")
});

static CREATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:write|create|design|compose|generate|build|develop|story|poem|essay|article|script|plan|strategy)\b",
    )
    .expect("creative pattern must compile")
});

static TECHNICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:algorithm|implementation|architecture|database|api|framework|optimization|debugging|testing|deployment|machine learning|neural network|regression|classification|concurrent|asynchronous|thread|process|memory leak)\b",
    )
    .expect("technical pattern must compile")
});

static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:```|function|class|def |import |public |private |void |int |string |return |if\(|for\(|while\()",
    )
    .expect("code pattern must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    Medium,
    Complex,
}

impl ComplexityLevel {
    /// Thresholds: 0-30 simple, 31-60 medium, 61+ complex.
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=30 => ComplexityLevel::Simple,
            31..=60 => ComplexityLevel::Medium,
            _ => ComplexityLevel::Complex,
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityLevel::Simple => f.write_str("simple"),
            ComplexityLevel::Medium => f.write_str("medium"),
            ComplexityLevel::Complex => f.write_str("complex"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub score: u32,
    pub level: ComplexityLevel,
    pub factor_scores: HashMap<String, u32>,
    pub reasoning: String,
    pub analysis_ms: u64,
}

impl ComplexityScore {
    fn minimal(reasoning: &str) -> Self {
        Self {
            score: 0,
            level: ComplexityLevel::Simple,
            factor_scores: HashMap::new(),
            reasoning: reasoning.to_string(),
            analysis_ms: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, prompt: &str) -> ComplexityScore {
        let started = Instant::now();

        if prompt.trim().is_empty() {
            return ComplexityScore::minimal("empty prompt");
        }

        let length = length_factor(prompt);
        let reasoning = reasoning_factor(prompt);
        let technical = technical_factor(prompt);

        let score = (length + reasoning + technical).min(100);
        let level = ComplexityLevel::from_score(score);

        let mut factor_scores = HashMap::new();
        factor_scores.insert("length".to_string(), length);
        factor_scores.insert("reasoning".to_string(), reasoning);
        factor_scores.insert("technical".to_string(), technical);

        let dominant = factor_scores
            .iter()
            .max_by_key(|(_, v)| **v)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| "length".to_string());
        let reasoning_text = format!("{level} query, primarily driven by the {dominant} factor");

        let result = ComplexityScore {
            score,
            level,
            factor_scores,
            reasoning: reasoning_text,
            analysis_ms: started.elapsed().as_millis() as u64,
        };
        debug!(score = result.score, level = %result.level, "Complexity analysis complete");
        result
    }
}

/// Length factor (0-30), bucketed by estimated tokens (len / 4).
fn length_factor(prompt: &str) -> u32 {
    let tokens = prompt.len() / 4;
    match tokens {
        0..=49 => 5,
        50..=99 => 10,
        100..=199 => 15,
        200..=399 => 20,
        _ => 30,
    }
}

/// Reasoning factor (0-40).
fn reasoning_factor(prompt: &str) -> u32 {
    let mut score = 0;

    let reasoning_hits = REASONING_RE.find_iter(prompt).count() as u32;
    if reasoning_hits > 0 {
        score += (reasoning_hits * 3).min(10);
    }

    let multistep_hits = MULTISTEP_RE.find_iter(prompt).count() as u32;
    if multistep_hits > 0 {
        score += (multistep_hits * 4).min(10);
    }

    let creative_hits = CREATIVE_RE.find_iter(prompt).count() as u32;
    if creative_hits > 0 {
        score += (creative_hits * 5).min(10);
    }

    let questions = prompt.chars().filter(|&c| c == '?').count() as u32;
    if questions > 1 {
        score += (questions * 3).min(10);
    }

    score.min(40)
}

/// Technical factor (0-30).
fn technical_factor(prompt: &str) -> u32 {
    let mut score = 0;

    let technical_hits = TECHNICAL_RE.find_iter(prompt).count() as u32;
    if technical_hits > 0 {
        score += (technical_hits * 4).min(15);
    }

    let code_hits = CODE_RE.find_iter(prompt).count() as u32;
    if code_hits > 0 {
        score += (code_hits * 5).min(15);
    }

    score.min(30)
}
