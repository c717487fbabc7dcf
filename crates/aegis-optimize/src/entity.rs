//! Entity extraction for protected spans
//!
//! Finds substrings whose exact wording carries meaning the optimizer must
//! not rewrite: amounts, dates, technology names, people, organizations,
//! bare numbers, and requirement/constraint clauses. Span-shaped kinds
//! protect the match itself; the requirement and constraint kinds expand
//! the keyword to its surrounding clause, since "must" alone is useless
//! without "be completed within 24 hours".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Amount,
    Date,
    Number,
    Technology,
    Person,
    Organization,
    Requirement,
    Constraint,
}

impl EntityKind {
    /// Overlap resolution rank; higher wins the span.
    fn priority(self) -> u8 {
        match self {
            EntityKind::Amount => 100,
            EntityKind::Technology => 90,
            EntityKind::Person => 80,
            EntityKind::Organization => 70,
            EntityKind::Date => 60,
            EntityKind::Requirement | EntityKind::Constraint => 50,
            EntityKind::Number => 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\d+(?:,\d{3})*(?:\.\d{2})?|\d+(?:,\d{3})* (?:USD|EUR|GBP|INR)|Rs\.? ?\d+(?:,\d{3})*")
        .expect("amount pattern must compile")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|[A-Z][a-z]+ \d{1,2},? \d{4}|\d{4}-\d{2}-\d{2})\b")
        .expect("date pattern must compile")
});

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:,\d{3})*(?:\.\d+)?\b").expect("number pattern must compile"));

static TECH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Python|Java|JavaScript|TypeScript|React|Angular|Node\.?js|Spring|Django|Flask|PostgreSQL|MongoDB|Redis|AWS|Azure|GCP|Docker|Kubernetes|Git|GitHub|API|REST|GraphQL|SQL|NoSQL|HTML|CSS|Machine Learning|AI|TensorFlow|PyTorch)\b",
    )
    .expect("technology pattern must compile")
});

static PERSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").expect("person pattern must compile"));

static ORG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*(?: Inc\.?| Corp\.?| Ltd\.?| LLC)?\b")
        .expect("organization pattern must compile")
});

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:must|required|need|necessary|should|have to|cannot|can't|must not)\b")
        .expect("requirement pattern must compile")
});

static CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:within \d+|less than \d+|more than \d+|maximum|minimum|at least|at most|no more than)\b",
    )
    .expect("constraint pattern must compile")
});

/// Extract entities sorted by start position, overlaps resolved by kind
/// priority (the earlier entity wins ties).
pub fn extract_entities(prompt: &str) -> Vec<Entity> {
    if prompt.trim().is_empty() {
        return Vec::new();
    }

    let mut entities = Vec::new();

    // Span-shaped kinds protect exactly what they match
    for (re, kind) in [
        (&*AMOUNT_RE, EntityKind::Amount),
        (&*DATE_RE, EntityKind::Date),
        (&*TECH_RE, EntityKind::Technology),
        (&*PERSON_RE, EntityKind::Person),
        (&*ORG_RE, EntityKind::Organization),
        (&*NUMBER_RE, EntityKind::Number),
    ] {
        for hit in re.find_iter(prompt) {
            if !should_include(hit.as_str(), kind) {
                continue;
            }
            entities.push(Entity {
                kind,
                value: hit.as_str().to_string(),
                start: hit.start(),
                end: hit.end(),
            });
        }
    }

    // Keyword kinds protect the surrounding clause
    for (re, kind) in [
        (&*REQUIREMENT_RE, EntityKind::Requirement),
        (&*CONSTRAINT_RE, EntityKind::Constraint),
    ] {
        for hit in re.find_iter(prompt) {
            let (start, end) = expand_phrase(prompt, hit.start(), hit.end());
            if start >= end {
                continue;
            }
            entities.push(Entity {
                kind,
                value: prompt[start..end].to_string(),
                start,
                end,
            });
        }
    }

    remove_overlaps(entities)
}

/// Filters out known false positives.
fn should_include(value: &str, kind: EntityKind) -> bool {
    match kind {
        // Single-digit numbers are rarely load-bearing
        EntityKind::Number => value.len() > 1,
        EntityKind::Person => {
            let lower = value.to_lowercase();
            lower != "the" && lower != "and" && value.len() > 3
        }
        EntityKind::Organization => value.len() > 2,
        _ => true,
    }
}

/// Grow a keyword match to its clause: back to the previous sentence
/// boundary, forward to the next one or at most ten words, whitespace
/// trimmed off both ends.
fn expand_phrase(text: &str, keyword_start: usize, keyword_end: usize) -> (usize, usize) {
    let mut start = keyword_start;
    for (i, c) in text[..keyword_start].char_indices().rev() {
        if is_phrase_boundary(c) {
            break;
        }
        start = i;
    }

    let mut end = keyword_end;
    let mut words = 0;
    for (offset, c) in text[keyword_end..].char_indices() {
        if is_phrase_boundary(c) || words >= 10 {
            break;
        }
        if c.is_whitespace() {
            words += 1;
        }
        end = keyword_end + offset + c.len_utf8();
    }

    let phrase = &text[start..end];
    let trimmed_start = start + (phrase.len() - phrase.trim_start().len());
    let trimmed_end = trimmed_start + phrase.trim().len();
    (trimmed_start, trimmed_end)
}

fn is_phrase_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ';' | '\n')
}

/// Sort by start and drop overlapped entities, keeping the higher
/// priority kind; on equal priority the earlier-extracted entity stays.
fn remove_overlaps(mut entities: Vec<Entity>) -> Vec<Entity> {
    if entities.len() <= 1 {
        return entities;
    }
    entities.sort_by_key(|e| e.start);

    let mut filtered: Vec<Entity> = Vec::with_capacity(entities.len());
    for current in entities {
        match filtered.last() {
            Some(previous) if current.start < previous.end => {
                if current.kind.priority() > previous.kind.priority() {
                    filtered.pop();
                    filtered.push(current);
                }
            }
            _ => filtered.push(current),
        }
    }
    filtered
}
