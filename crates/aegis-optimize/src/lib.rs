//! Aegis Prompt Optimization
//!
//! Pure regex compression passes over the redacted prompt:
//! redundancy replacement, filler-word removal, verbose-phrase
//! simplification and whitespace compression, in that order. Extracted
//! entities and sensitive-value tokens are protected spans no pass may
//! touch.

pub mod entity;
pub mod optimizer;

pub use entity::{Entity, EntityKind, extract_entities};
pub use optimizer::{
    OptimizationOutcome, OptimizerConfig, PromptOptimizer, StopwordConfig, StrategyConfig,
};
