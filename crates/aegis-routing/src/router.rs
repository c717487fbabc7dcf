//! Strategy-driven model selection

use crate::complexity::{ComplexityLevel, ComplexityScore};
use crate::registry::{ModelProfile, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Closed set of routing policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStrategy {
    /// Route on the complexity level (recommended default).
    #[default]
    Complexity,
    /// Always the cheapest enabled model.
    Cost,
    /// Always the most capable enabled model.
    Performance,
    /// Cost-lean variant of `Complexity`: premium models only for
    /// decidedly complex prompts.
    Balanced,
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingStrategy::Complexity => f.write_str("complexity"),
            RoutingStrategy::Cost => f.write_str("cost"),
            RoutingStrategy::Performance => f.write_str("performance"),
            RoutingStrategy::Balanced => f.write_str("balanced"),
        }
    }
}

/// The routing outcome, including the rationale for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDecision {
    pub model_id: String,
    pub display_name: String,
    pub strategy_used: RoutingStrategy,
    pub rationale: String,
    pub complexity: ComplexityScore,
    pub routing_ms: u64,
}

pub struct ModelRouter {
    registry: Arc<ModelRegistry>,
    default_strategy: RoutingStrategy,
}

impl ModelRouter {
    pub fn new(registry: Arc<ModelRegistry>, default_strategy: RoutingStrategy) -> Self {
        Self {
            registry,
            default_strategy,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn route(&self, complexity: &ComplexityScore) -> ModelDecision {
        self.route_with(complexity, self.default_strategy)
    }

    pub fn route_with(
        &self,
        complexity: &ComplexityScore,
        strategy: RoutingStrategy,
    ) -> ModelDecision {
        let started = Instant::now();

        let selected = self.select(complexity, strategy);
        // A disabled selection falls back to the registry default, which
        // is enabled by construction.
        let selected = if selected.enabled {
            selected
        } else {
            debug!(model_id = %selected.model_id, "Selected profile disabled, using fallback");
            self.registry.fallback()
        };

        let rationale = build_rationale(complexity, strategy, selected);
        let decision = ModelDecision {
            model_id: selected.model_id.clone(),
            display_name: selected.display_name.clone(),
            strategy_used: strategy,
            rationale,
            complexity: complexity.clone(),
            routing_ms: started.elapsed().as_millis() as u64,
        };
        debug!(model_id = %decision.model_id, strategy = %strategy, "Routing decision made");
        decision
    }

    fn select(&self, complexity: &ComplexityScore, strategy: RoutingStrategy) -> &ModelProfile {
        let registry = &self.registry;
        match strategy {
            RoutingStrategy::Complexity => match complexity.level {
                ComplexityLevel::Simple | ComplexityLevel::Medium => registry.fallback(),
                ComplexityLevel::Complex => registry.most_capable(),
            },
            RoutingStrategy::Cost => registry.cheapest(),
            RoutingStrategy::Performance => registry.most_capable(),
            RoutingStrategy::Balanced => match complexity.level {
                ComplexityLevel::Simple => registry.cheapest(),
                ComplexityLevel::Medium => registry.fallback(),
                ComplexityLevel::Complex => {
                    if complexity.score >= 75 {
                        registry.most_capable()
                    } else {
                        registry.fallback()
                    }
                }
            },
        }
    }
}

fn build_rationale(
    complexity: &ComplexityScore,
    strategy: RoutingStrategy,
    selected: &ModelProfile,
) -> String {
    match strategy {
        RoutingStrategy::Complexity => format!(
            "Complexity score {} ({}) selected {} for the cost/quality balance",
            complexity.score, complexity.level, selected.display_name
        ),
        RoutingStrategy::Cost => format!(
            "Cost strategy selected cheapest model {} (${:.6}/1k input)",
            selected.display_name, selected.input_cost_per_1k
        ),
        RoutingStrategy::Performance => format!(
            "Performance strategy selected most capable model {}",
            selected.display_name
        ),
        RoutingStrategy::Balanced => format!(
            "Balanced strategy with score {} selected {}",
            complexity.score, selected.display_name
        ),
    }
}
