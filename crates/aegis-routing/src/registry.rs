//! Model profile registry
//!
//! Profiles are registered once at startup and shared read-only. The
//! registry designates a fallback profile that every routing path can
//! rely on, so it must exist and be enabled.

use crate::complexity::ComplexityLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Fallback model '{0}' is not registered")]
    FallbackMissing(String),

    #[error("Fallback model '{0}' is disabled")]
    FallbackDisabled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    Basic,
    Standard,
    Advanced,
}

impl CapabilityTier {
    /// Minimum tier able to serve a complexity level.
    pub fn required_for(level: ComplexityLevel) -> Self {
        match level {
            ComplexityLevel::Simple => CapabilityTier::Basic,
            ComplexityLevel::Medium => CapabilityTier::Standard,
            ComplexityLevel::Complex => CapabilityTier::Advanced,
        }
    }
}

/// Immutable description of one routable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model_id: String,
    pub display_name: String,
    pub provider: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub max_context_tokens: u32,
    pub capability: CapabilityTier,
    pub enabled: bool,
}

impl ModelProfile {
    pub fn gpt_4o_mini() -> Self {
        Self {
            model_id: "gpt-4o-mini".into(),
            display_name: "GPT-4o Mini".into(),
            provider: "OpenAI".into(),
            input_cost_per_1k: 0.000_15,
            output_cost_per_1k: 0.000_6,
            max_context_tokens: 128_000,
            capability: CapabilityTier::Standard,
            enabled: true,
        }
    }

    pub fn gpt_4o() -> Self {
        Self {
            model_id: "gpt-4o".into(),
            display_name: "GPT-4o".into(),
            provider: "OpenAI".into(),
            input_cost_per_1k: 0.002_5,
            output_cost_per_1k: 0.01,
            max_context_tokens: 128_000,
            capability: CapabilityTier::Advanced,
            enabled: true,
        }
    }

    pub fn gpt_35_turbo() -> Self {
        Self {
            model_id: "gpt-3.5-turbo".into(),
            display_name: "GPT-3.5 Turbo".into(),
            provider: "OpenAI".into(),
            input_cost_per_1k: 0.000_5,
            output_cost_per_1k: 0.001_5,
            max_context_tokens: 16_385,
            capability: CapabilityTier::Basic,
            enabled: true,
        }
    }
}

pub struct ModelRegistry {
    models: HashMap<String, ModelProfile>,
    fallback_id: String,
}

impl ModelRegistry {
    /// Registry preloaded with the default OpenAI profiles;
    /// `gpt-4o-mini` is the fallback.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            models: HashMap::new(),
            fallback_id: "gpt-4o-mini".to_string(),
        };
        registry.register(ModelProfile::gpt_4o_mini());
        registry.register(ModelProfile::gpt_4o());
        registry.register(ModelProfile::gpt_35_turbo());
        registry
    }

    pub fn new(profiles: Vec<ModelProfile>, fallback_id: &str) -> Result<Self, RegistryError> {
        let models: HashMap<String, ModelProfile> = profiles
            .into_iter()
            .map(|p| (p.model_id.clone(), p))
            .collect();
        match models.get(fallback_id) {
            None => return Err(RegistryError::FallbackMissing(fallback_id.to_string())),
            Some(p) if !p.enabled => {
                return Err(RegistryError::FallbackDisabled(fallback_id.to_string()))
            }
            Some(_) => {}
        }
        Ok(Self {
            models,
            fallback_id: fallback_id.to_string(),
        })
    }

    pub fn register(&mut self, profile: ModelProfile) {
        debug!(model_id = %profile.model_id, "Registered model profile");
        self.models.insert(profile.model_id.clone(), profile);
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelProfile> {
        self.models.get(model_id)
    }

    /// The designated fallback. Guaranteed registered and enabled.
    pub fn fallback(&self) -> &ModelProfile {
        self.models
            .get(&self.fallback_id)
            .expect("fallback profile is validated at construction")
    }

    pub fn all(&self) -> Vec<&ModelProfile> {
        let mut profiles: Vec<&ModelProfile> = self.models.values().collect();
        profiles.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        profiles
    }

    pub fn enabled(&self) -> Vec<&ModelProfile> {
        self.all().into_iter().filter(|p| p.enabled).collect()
    }

    /// Cheapest enabled profile by input cost.
    pub fn cheapest(&self) -> &ModelProfile {
        self.enabled()
            .into_iter()
            .min_by(|a, b| {
                a.input_cost_per_1k
                    .partial_cmp(&b.input_cost_per_1k)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|| self.fallback())
    }

    /// Most capable enabled profile; cost breaks ties.
    pub fn most_capable(&self) -> &ModelProfile {
        self.enabled()
            .into_iter()
            .max_by(|a, b| {
                a.capability.cmp(&b.capability).then(
                    b.input_cost_per_1k
                        .partial_cmp(&a.input_cost_per_1k)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
            })
            .unwrap_or_else(|| self.fallback())
    }

    /// Cheapest enabled profile whose tier can serve the level.
    pub fn cheapest_capable_of(&self, level: ComplexityLevel) -> &ModelProfile {
        let needed = CapabilityTier::required_for(level);
        self.enabled()
            .into_iter()
            .filter(|p| p.capability >= needed)
            .min_by(|a, b| {
                a.input_cost_per_1k
                    .partial_cmp(&b.input_cost_per_1k)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or_else(|| self.fallback())
    }

    /// Informational cost estimate from the profile's per-1k rates.
    pub fn estimate_cost(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let profile = self.get(model_id).unwrap_or_else(|| self.fallback());
        (input_tokens as f64 / 1000.0) * profile.input_cost_per_1k
            + (output_tokens as f64 / 1000.0) * profile.output_cost_per_1k
    }
}
