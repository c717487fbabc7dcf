//! Sensitive-value kind definitions and the pattern registry
//!
//! Each kind is a value-typed record: a compiled regex, a region label, a
//! default-enabled flag and a validator. Validators carry the semantic
//! checks a regex cannot express (Luhn, SSN issuing rules, E.164 shape).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Validator signature. Must be a pure, total function on strings.
pub type Validator = fn(&str) -> bool;

#[derive(Debug, Error)]
pub enum PiiError {
    #[error("Invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate kind: {0}")]
    DuplicateKind(String),
}

/// A registered sensitive-value kind.
pub struct KindRecord {
    /// Uppercase name, also used in token text (e.g. `EMAIL`).
    pub name: String,
    pub regex: Regex,
    pub region: String,
    pub enabled_by_default: bool,
    pub validator: Validator,
}

impl KindRecord {
    pub fn validate(&self, candidate: &str) -> bool {
        (self.validator)(candidate)
    }
}

impl std::fmt::Debug for KindRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRecord")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("enabled_by_default", &self.enabled_by_default)
            .finish()
    }
}

/// User-defined pattern registered from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub regex: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_region() -> String {
    "Universal".to_string()
}

fn default_true() -> bool {
    true
}

/// Holds every known kind. Immutable after startup; a malformed custom
/// pattern fails registration, never a request.
pub struct PatternRegistry {
    kinds: Vec<KindRecord>,
}

impl PatternRegistry {
    /// Registry with the built-in kinds only.
    pub fn builtin() -> Self {
        Self {
            kinds: builtin_kinds(),
        }
    }

    /// Add user-defined kinds on top of the built-ins.
    pub fn with_custom(custom: &[CustomPattern]) -> Result<Self, PiiError> {
        let mut registry = Self::builtin();
        for pattern in custom {
            registry.register_custom(pattern)?;
        }
        Ok(registry)
    }

    pub fn register_custom(&mut self, pattern: &CustomPattern) -> Result<(), PiiError> {
        let name = pattern.name.to_uppercase().replace(['-', ' '], "_");
        if self.kinds.iter().any(|k| k.name == name) {
            return Err(PiiError::DuplicateKind(name));
        }
        let regex = Regex::new(&pattern.regex).map_err(|source| PiiError::InvalidPattern {
            name: pattern.name.clone(),
            source,
        })?;
        tracing::debug!(kind = %name, region = %pattern.region, "Registered custom pattern");
        self.kinds.push(KindRecord {
            name,
            regex,
            region: pattern.region.clone(),
            enabled_by_default: pattern.enabled,
            validator: validate_always,
        });
        Ok(())
    }

    pub fn kinds(&self) -> &[KindRecord] {
        &self.kinds
    }

    pub fn get(&self, name: &str) -> Option<&KindRecord> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// Kinds that are active under the given per-kind overrides. A kind
    /// absent from the override map keeps its default.
    pub fn enabled_kinds(&self, overrides: &HashMap<String, bool>) -> Vec<&KindRecord> {
        self.kinds
            .iter()
            .filter(|k| *overrides.get(&k.name).unwrap_or(&k.enabled_by_default))
            .collect()
    }
}

fn builtin_kinds() -> Vec<KindRecord> {
    // Patterns are compiled once here. The literals are fixed so the
    // expect calls cannot fire for any build that passed tests.
    let compile = |pattern: &str| Regex::new(pattern).expect("built-in pattern must compile");

    vec![
        // Universal tier, enabled by default
        KindRecord {
            name: "EMAIL".into(),
            regex: compile(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
            region: "Universal".into(),
            enabled_by_default: true,
            validator: validate_email,
        },
        KindRecord {
            name: "PHONE".into(),
            // E.164: up to 15 digits, optional leading +
            regex: compile(r"\+?[1-9]\d{1,14}"),
            region: "Universal".into(),
            enabled_by_default: true,
            validator: validate_phone,
        },
        KindRecord {
            name: "CREDIT_CARD".into(),
            regex: compile(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b"),
            region: "Universal".into(),
            enabled_by_default: true,
            validator: validate_credit_card,
        },
        KindRecord {
            name: "API_KEY".into(),
            regex: compile(r"\b(?:sk|pk|api)[-_]?[a-zA-Z0-9]{20,}\b"),
            region: "Universal".into(),
            enabled_by_default: true,
            validator: validate_always,
        },
        // Geographic tier, enabled per deployment region
        KindRecord {
            name: "SSN".into(),
            regex: compile(r"\b\d{3}-\d{2}-\d{4}\b"),
            region: "United States".into(),
            enabled_by_default: false,
            validator: validate_ssn,
        },
        KindRecord {
            name: "AADHAAR".into(),
            regex: compile(r"\b\d{4}\s?\d{4}\s?\d{4}\b"),
            region: "India".into(),
            enabled_by_default: false,
            validator: validate_aadhaar,
        },
        KindRecord {
            name: "PAN".into(),
            regex: compile(r"\b[A-Z]{5}[0-9]{4}[A-Z]\b"),
            region: "India".into(),
            enabled_by_default: false,
            validator: validate_always,
        },
        KindRecord {
            name: "NI".into(),
            regex: compile(r"\b[A-Z]{2}\d{6}[A-Z]\b"),
            region: "United Kingdom".into(),
            enabled_by_default: false,
            validator: validate_always,
        },
        // Context tier: often legitimately present in logs
        KindRecord {
            name: "IP_ADDRESS".into(),
            regex: compile(r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
            region: "Universal".into(),
            enabled_by_default: false,
            validator: validate_ip_address,
        },
    ]
}

fn validate_always(_: &str) -> bool {
    true
}

fn validate_email(email: &str) -> bool {
    // Drop well-known placeholder addresses
    if email.contains("test@") || email.contains("fake@") {
        return false;
    }
    // TLD must be at least two characters
    match email.rsplit('.').next() {
        Some(tld) => tld.len() >= 2,
        None => false,
    }
}

fn validate_phone(phone: &str) -> bool {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // E.164 length
    if digits.len() < 7 || digits.len() > 15 {
        return false;
    }
    // Uniform digits (1111111111) are never real numbers
    if is_uniform(&digits) {
        return false;
    }
    // Neither are strictly sequential runs (1234567890)
    if is_sequential(&digits) {
        return false;
    }
    true
}

fn validate_credit_card(card: &str) -> bool {
    let digits: Vec<u32> = card.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    luhn_checksum(&digits) % 10 == 0
}

fn luhn_checksum(digits: &[u32]) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum()
}

fn validate_ssn(ssn: &str) -> bool {
    let digits: String = ssn.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 9 {
        return false;
    }
    let area = &digits[0..3];
    let group = &digits[3..5];
    let serial = &digits[5..9];

    // Area/group/serial ranges the SSA never issues
    if area == "000" || area == "666" || area.starts_with('9') {
        return false;
    }
    if group == "00" || serial == "0000" {
        return false;
    }
    true
}

fn validate_aadhaar(aadhaar: &str) -> bool {
    let digits: String = aadhaar.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.len() == 12 && !is_uniform(&digits)
}

fn validate_ip_address(ip: &str) -> bool {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    octets.iter().all(|o| o.parse::<u16>().is_ok_and(|v| v <= 255))
}

fn is_uniform(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

fn is_sequential(digits: &str) -> bool {
    let values: Vec<i32> = digits
        .chars()
        .filter_map(|c| c.to_digit(10).map(|d| d as i32))
        .collect();
    if values.len() < 2 {
        return false;
    }
    values.windows(2).all(|w| (w[1] - w[0]).abs() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_accepts_valid_card() {
        // 4532015112830366 is a known Luhn-valid test number
        assert!(validate_credit_card("4532-0151-1283-0366"));
        assert!(validate_credit_card("4532015112830366"));
    }

    #[test]
    fn test_luhn_rejects_invalid_card() {
        assert!(!validate_credit_card("4532-0151-1283-0367"));
        // Too short / too long
        assert!(!validate_credit_card("4111-1111"));
    }

    #[test]
    fn test_ssn_issuing_rules() {
        assert!(validate_ssn("123-45-6789"));
        assert!(!validate_ssn("000-45-6789")); // area 000
        assert!(!validate_ssn("666-45-6789")); // area 666
        assert!(!validate_ssn("912-45-6789")); // area 9xx
        assert!(!validate_ssn("123-00-6789")); // group 00
        assert!(!validate_ssn("123-45-0000")); // serial 0000
    }

    #[test]
    fn test_phone_rejects_degenerate_sequences() {
        assert!(validate_phone("+14155552671"));
        assert!(!validate_phone("1111111111")); // uniform
        assert!(!validate_phone("1234567890")); // ascending
        assert!(!validate_phone("9876543210")); // descending
        assert!(!validate_phone("123456")); // too short
        assert!(!validate_phone("1234567890123456")); // too long
    }

    #[test]
    fn test_email_validator() {
        assert!(validate_email("john.doe@example.com"));
        assert!(!validate_email("test@example.com"));
        assert!(!validate_email("fake@example.com"));
        assert!(!validate_email("user@domain.x"));
    }

    #[test]
    fn test_ip_octet_range() {
        assert!(validate_ip_address("192.168.1.1"));
        assert!(validate_ip_address("255.255.255.255"));
        assert!(!validate_ip_address("256.1.1.1"));
        assert!(!validate_ip_address("300.300.300.300"));
    }

    #[test]
    fn test_aadhaar_validator() {
        assert!(validate_aadhaar("2345 6789 0123"));
        assert!(!validate_aadhaar("1111 1111 1111"));
        assert!(!validate_aadhaar("1234 5678"));
    }

    #[test]
    fn test_custom_pattern_registration() {
        let mut registry = PatternRegistry::builtin();
        registry
            .register_custom(&CustomPattern {
                name: "employee-id".into(),
                regex: r"\bEMP-\d{6}\b".into(),
                region: "Universal".into(),
                enabled: true,
            })
            .unwrap();
        assert!(registry.get("EMPLOYEE_ID").is_some());
    }

    #[test]
    fn test_malformed_custom_pattern_fails_registration() {
        let mut registry = PatternRegistry::builtin();
        let result = registry.register_custom(&CustomPattern {
            name: "broken".into(),
            regex: "(unclosed".into(),
            region: "Universal".into(),
            enabled: true,
        });
        assert!(matches!(result, Err(PiiError::InvalidPattern { .. })));
    }

    #[test]
    fn test_enabled_kinds_respect_overrides() {
        let registry = PatternRegistry::builtin();
        let mut overrides = HashMap::new();
        overrides.insert("SSN".to_string(), true);
        overrides.insert("EMAIL".to_string(), false);

        let enabled = registry.enabled_kinds(&overrides);
        assert!(enabled.iter().any(|k| k.name == "SSN"));
        assert!(!enabled.iter().any(|k| k.name == "EMAIL"));
        // Untouched defaults survive
        assert!(enabled.iter().any(|k| k.name == "PHONE"));
        assert!(!enabled.iter().any(|k| k.name == "IP_ADDRESS"));
    }
}
