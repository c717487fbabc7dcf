//! Aegis Sensitive-Value Detection and Redaction
//!
//! This crate provides the privacy boundary of the gateway:
//! - Built-in and custom regex patterns with per-kind validators
//! - Overlap-resolved detection over enabled kinds
//! - Reversible token substitution with a per-request mapping context

pub mod context;
pub mod detector;
pub mod pattern;
pub mod redactor;

pub use context::{SvContext, SvDetection};
pub use detector::{DetectionReport, Detector, RegexDetector, SvMatch};
pub use pattern::{CustomPattern, KindRecord, PatternRegistry, PiiError};
pub use redactor::{token_regex, Redactor, RedactorConfig, TokenGeneration};
