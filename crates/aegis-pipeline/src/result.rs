//! Pipeline request/result DTOs

use aegis_core::ProviderResponse;
use aegis_optimize::OptimizationOutcome;
use aegis_routing::{ComplexityScore, ModelDecision, RoutingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validated completion request entering the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub query: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// Explicit model choice; bypasses strategy selection when valid.
    pub model: Option<String>,
    pub routing_strategy: Option<RoutingStrategy>,
    pub enable_optimization: bool,
    pub enable_cache: bool,
}

impl GatewayRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_tokens: 1000,
            temperature: None,
            top_p: None,
            model: None,
            routing_strategy: None,
            enable_optimization: true,
            enable_cache: true,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Everything a request produced, success or failure. The `success` flag
/// disambiguates; metadata fields stay populated as far as the pipeline
/// got.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub request_id: Uuid,
    pub success: bool,
    pub response_text: Option<String>,
    pub error: Option<String>,
    pub error_type: Option<String>,

    pub sv_detected: bool,
    pub sv_count: usize,
    pub optimization: Option<OptimizationOutcome>,
    pub complexity: Option<ComplexityScore>,
    pub routing: Option<ModelDecision>,
    pub provider_response: Option<ProviderResponse>,
    pub from_cache: bool,
    pub estimated_cost: Option<f64>,
    pub total_latency_ms: u64,
}

impl ProcessingResult {
    pub(crate) fn empty(request_id: Uuid) -> Self {
        Self {
            request_id,
            success: false,
            response_text: None,
            error: None,
            error_type: None,
            sv_detected: false,
            sv_count: 0,
            optimization: None,
            complexity: None,
            routing: None,
            provider_response: None,
            from_cache: false,
            estimated_cost: None,
            total_latency_ms: 0,
        }
    }
}
