//! Sensitive-value detection over the enabled kinds

use crate::pattern::{KindRecord, PatternRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A validated regex hit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvMatch {
    /// Uppercase kind name (e.g. `EMAIL`).
    pub kind: String,
    /// The matched text.
    pub value: String,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
}

impl SvMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Non-overlapping matches sorted by start position.
    pub matches: Vec<SvMatch>,
    pub elapsed_ms: u64,
}

impl DetectionReport {
    pub fn detected(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn count(&self) -> usize {
        self.matches.len()
    }
}

/// Detection seam the pipeline is wired against.
pub trait Detector: Send + Sync {
    fn detect(&self, text: &str) -> DetectionReport;

    /// Names of the kinds this detector runs.
    fn enabled_kind_names(&self) -> Vec<String>;
}

/// Regex-based detector over a shared pattern registry.
pub struct RegexDetector {
    registry: Arc<PatternRegistry>,
    /// Per-kind enable overrides from configuration.
    overrides: HashMap<String, bool>,
}

impl RegexDetector {
    pub fn new(registry: Arc<PatternRegistry>, overrides: HashMap<String, bool>) -> Self {
        Self {
            registry,
            overrides,
        }
    }

    fn enabled(&self) -> Vec<&KindRecord> {
        self.registry.enabled_kinds(&self.overrides)
    }

    /// Keep a non-overlapping subset: sort by (start asc, length desc),
    /// then greedily accept a match iff it starts at or after the end of
    /// the last accepted one. Ties at the same start keep the longer span,
    /// so a full email wins over its bare local part.
    fn resolve_overlaps(mut matches: Vec<SvMatch>) -> Vec<SvMatch> {
        if matches.len() <= 1 {
            return matches;
        }
        matches.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));

        let mut accepted: Vec<SvMatch> = Vec::with_capacity(matches.len());
        for m in matches {
            match accepted.last() {
                Some(last) if m.start < last.end => {
                    debug!(
                        kind = %m.kind,
                        start = m.start,
                        "Dropping overlapped match"
                    );
                }
                _ => accepted.push(m),
            }
        }
        accepted
    }
}

impl Detector for RegexDetector {
    fn detect(&self, text: &str) -> DetectionReport {
        let started = Instant::now();

        if text.trim().is_empty() {
            return DetectionReport {
                matches: Vec::new(),
                elapsed_ms: 0,
            };
        }

        let mut matches = Vec::new();
        for kind in self.enabled() {
            for hit in kind.regex.find_iter(text) {
                let value = hit.as_str();
                if kind.validate(value) {
                    matches.push(SvMatch {
                        kind: kind.name.clone(),
                        value: value.to_string(),
                        start: hit.start(),
                        end: hit.end(),
                    });
                }
            }
        }

        let matches = Self::resolve_overlaps(matches);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            count = matches.len(),
            elapsed_ms, "Sensitive-value detection complete"
        );

        DetectionReport {
            matches,
            elapsed_ms,
        }
    }

    fn enabled_kind_names(&self) -> Vec<String> {
        self.enabled().iter().map(|k| k.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RegexDetector {
        RegexDetector::new(Arc::new(PatternRegistry::builtin()), HashMap::new())
    }

    fn detector_with(overrides: &[(&str, bool)]) -> RegexDetector {
        let map = overrides
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        RegexDetector::new(Arc::new(PatternRegistry::builtin()), map)
    }

    #[test]
    fn test_empty_text_returns_no_matches() {
        let report = detector().detect("");
        assert!(!report.detected());
        let report = detector().detect("   \n\t  ");
        assert!(!report.detected());
    }

    #[test]
    fn test_email_detection() {
        let report = detector().detect("Contact me at john.doe@example.com for more info.");
        assert_eq!(report.count(), 1);
        assert_eq!(report.matches[0].kind, "EMAIL");
        assert_eq!(report.matches[0].value, "john.doe@example.com");
    }

    #[test]
    fn test_disabled_kind_is_skipped() {
        // SSN is off by default
        let report = detector().detect("SSN: 123-45-6789");
        assert!(report.matches.iter().all(|m| m.kind != "SSN"));

        let report = detector_with(&[("SSN", true)]).detect("SSN: 123-45-6789");
        assert!(report.matches.iter().any(|m| m.kind == "SSN"));
    }

    #[test]
    fn test_luhn_filtering_in_detection() {
        let report = detector().detect("Card: 4532-0151-1283-0366");
        assert!(report.matches.iter().any(|m| m.kind == "CREDIT_CARD"));

        let report = detector().detect("Card: 4532-0151-1283-0367");
        assert!(report.matches.iter().all(|m| m.kind != "CREDIT_CARD"));
    }

    #[test]
    fn test_api_key_detection() {
        let report = detector().detect("key sk-abcdefghijklmnopqrst1234 is live");
        assert!(report.matches.iter().any(|m| m.kind == "API_KEY"));
    }

    #[test]
    fn test_matches_sorted_and_non_overlapping() {
        let text = "Mail a@example.com then card 4532 0151 1283 0366, call +14155552671.";
        let report = detector().detect(text);

        for window in report.matches.windows(2) {
            assert!(window[0].start < window[1].start);
            assert!(window[0].end <= window[1].start, "spans must not overlap");
        }
    }

    #[test]
    fn test_detection_is_deterministic() {
        let text = "Reach alice@corp.io or +442071838750, card 4532015112830366.";
        let d = detector();
        let first = d.detect(text).matches;
        for _ in 0..5 {
            assert_eq!(d.detect(text).matches, first);
        }
    }

    #[test]
    fn test_overlap_tie_prefers_longer_span() {
        let matches = vec![
            SvMatch {
                kind: "PHONE".into(),
                value: "1415555".into(),
                start: 10,
                end: 17,
            },
            SvMatch {
                kind: "CREDIT_CARD".into(),
                value: "1415 5552 6710 0342".into(),
                start: 10,
                end: 29,
            },
        ];
        let resolved = RegexDetector::resolve_overlaps(matches);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].kind, "CREDIT_CARD");
    }

    #[test]
    fn test_overlap_keeps_first_by_position() {
        let matches = vec![
            SvMatch {
                kind: "A".into(),
                value: "xxxx".into(),
                start: 0,
                end: 4,
            },
            SvMatch {
                kind: "B".into(),
                value: "xxx".into(),
                start: 2,
                end: 5,
            },
            SvMatch {
                kind: "C".into(),
                value: "yy".into(),
                start: 4,
                end: 6,
            },
        ];
        let resolved = RegexDetector::resolve_overlaps(matches);
        let kinds: Vec<_> = resolved.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["A", "C"]);
    }
}
